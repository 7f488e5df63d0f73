//! # Route Groups
//!
//! A group is a path prefix plus the middleware scoped to it. Groups live in
//! the engine's group list; a [`RouterGroup`] is a short-lived handle to one
//! entry that borrows the engine mutably for registration.
//!
//! Group middleware is matched by string prefix at request time, so it also
//! runs for routes registered outside the group when their path happens to
//! start with the group prefix. Groups never see the not-found chain.

use crate::context::Context;
use crate::engine::Engine;
use crate::router::Method;
use crate::static_files::{Dir, FileSystem};
use std::path::Path;
use std::sync::Arc;

/// Registration handle for one route group
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    index: usize,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, index: usize) -> Self {
        Self { engine, index }
    }

    /// Absolute prefix of this group
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.engine.group_entry(self.index).prefix
    }

    /// Create a nested group below this one
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.engine.new_group(self.index, prefix);
        RouterGroup::new(&mut *self.engine, index)
    }

    /// Append middleware scoped to this group's prefix
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.engine
            .group_entry_mut(self.index)
            .middlewares
            .push(Arc::new(middleware));
        self
    }

    /// Register `handler` for `method` at `prefix + pattern`
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern or a clashing variable segment.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.engine
            .add_route_in(self.index, method, pattern, Arc::new(handler));
        self
    }

    /// Register a GET route
    ///
    /// # Panics
    ///
    /// See [`RouterGroup::route`].
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Get, pattern, handler)
    }

    /// Register a POST route
    ///
    /// # Panics
    ///
    /// See [`RouterGroup::route`].
    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Post, pattern, handler)
    }

    /// Register a HEAD route
    ///
    /// # Panics
    ///
    /// See [`RouterGroup::route`].
    pub fn head<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Head, pattern, handler)
    }

    /// Register a PUT route
    ///
    /// # Panics
    ///
    /// See [`RouterGroup::route`].
    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Put, pattern, handler)
    }

    /// Register a DELETE route
    ///
    /// # Panics
    ///
    /// See [`RouterGroup::route`].
    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Delete, pattern, handler)
    }

    /// Serve files under directory `root` at `prefix + relative_path`
    ///
    /// # Panics
    ///
    /// Panics if `relative_path` contains `:` or `*`.
    pub fn static_dir(&mut self, relative_path: &str, root: impl AsRef<Path>) -> &mut Self {
        self.engine
            .static_in(self.index, relative_path, Arc::new(Dir::new(root.as_ref())));
        self
    }

    /// Serve files from `fs` at `prefix + relative_path`
    ///
    /// # Panics
    ///
    /// Panics if `relative_path` contains `:` or `*`.
    pub fn static_fs(&mut self, relative_path: &str, fs: impl FileSystem + 'static) -> &mut Self {
        self.engine.static_in(self.index, relative_path, Arc::new(fs));
        self
    }
}

impl std::fmt::Debug for RouterGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGroup")
            .field("prefix", &self.prefix())
            .finish_non_exhaustive()
    }
}
