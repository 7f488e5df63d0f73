//! # Engine
//!
//! Top-level entry point: owns the router, every route group ever created,
//! the templates and the fallback chains, and turns one [`Request`] into one
//! [`Response`].
//!
//! ## Lifecycle
//!
//! Everything is configured through `&mut Engine` at startup. Serving only
//! needs `&Engine`, so the finished engine is frozen behind an `Arc` and
//! shared by every request without locks.
//!
//! ## Pipelines
//!
//! - route hit: middleware of every group whose prefix is a string prefix of
//!   the request path (in group creation order), then the route handler
//! - route miss: the cached not-found chain, i.e. engine-level middleware
//!   followed by the `no_route` handlers, under status 404
//! - method miss (opt-in): the cached method-not-allowed chain, under 405
//!
//! The two cached chains are rebuilt by [`Engine::rebuild_fallbacks`], which
//! every mutator of engine-level middleware or fallback handlers calls.

use crate::config::EngineConfig;
use crate::context::{Context, HandlerFunc};
use crate::error::Result;
use crate::group::RouterGroup;
use crate::middleware::{logger, recovery};
use crate::render::Templates;
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteInfo;
use crate::router::{Method, Router};
use crate::static_files::{static_handler, Dir, FileSystem};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Upper bound (exclusive) on the length of a combined fallback pipeline
pub const MAX_PIPELINE_LEN: usize = 63;

const DEFAULT_404_BODY: &str = "404 page not found";
const DEFAULT_405_BODY: &str = "405 method not allowed";

/// Index of the engine's own group in `Engine::groups`
pub(crate) const ROOT_GROUP: usize = 0;

/// A prefix and the middleware scoped to it
pub(crate) struct GroupEntry {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<HandlerFunc>,
}

/// Router, groups and fallback handling in one place
pub struct Engine {
    router: Router<HandlerFunc>,
    groups: Vec<GroupEntry>,
    templates: Templates,
    no_route: Vec<HandlerFunc>,
    no_method: Vec<HandlerFunc>,
    all_no_route: Vec<HandlerFunc>,
    all_no_method: Vec<HandlerFunc>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with no middleware and default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with no middleware and the given configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            router: Router::new(),
            groups: vec![GroupEntry {
                prefix: String::new(),
                middlewares: Vec::new(),
            }],
            templates: Templates::new(),
            no_route: Vec::new(),
            no_method: Vec::new(),
            all_no_route: Vec::new(),
            all_no_method: Vec::new(),
            config,
        }
    }

    /// Engine with the request logger and panic recovery installed
    #[must_use]
    pub fn with_default_middleware() -> Self {
        let mut engine = Self::new();
        engine.use_middleware(logger()).use_middleware(recovery());
        engine
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enable or disable 405 dispatch for path matches under other methods
    pub fn handle_method_not_allowed(&mut self, enabled: bool) -> &mut Self {
        self.config.handle_method_not_allowed = enabled;
        self
    }

    // ---- groups & middleware ---------------------------------------------

    /// Create a group whose prefix is `prefix` below the engine root
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.new_group(ROOT_GROUP, prefix);
        RouterGroup::new(self, index)
    }

    pub(crate) fn new_group(&mut self, parent: usize, relative: &str) -> usize {
        let prefix = join_paths(&self.groups[parent].prefix, relative);
        self.groups.push(GroupEntry {
            prefix,
            middlewares: Vec::new(),
        });
        self.groups.len() - 1
    }

    pub(crate) fn group_entry(&self, index: usize) -> &GroupEntry {
        &self.groups[index]
    }

    pub(crate) fn group_entry_mut(&mut self, index: usize) -> &mut GroupEntry {
        &mut self.groups[index]
    }

    /// Add engine-level middleware
    ///
    /// It runs for every routed request and is part of both fallback chains.
    ///
    /// # Panics
    ///
    /// Panics if a fallback chain would reach [`MAX_PIPELINE_LEN`].
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.groups[ROOT_GROUP]
            .middlewares
            .push(Arc::new(middleware));
        self.rebuild_fallbacks();
        self
    }

    /// Replace the handlers run when no route matches
    ///
    /// # Panics
    ///
    /// Panics if the combined chain would reach [`MAX_PIPELINE_LEN`].
    pub fn no_route<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.no_route = handlers.into_iter().collect();
        self.rebuild_fallbacks();
        self
    }

    /// Replace the handlers run when only another method matches
    ///
    /// Only consulted when `handle_method_not_allowed` is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the combined chain would reach [`MAX_PIPELINE_LEN`].
    pub fn no_method<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.no_method = handlers.into_iter().collect();
        self.rebuild_fallbacks();
        self
    }

    /// Recompute the cached fallback chains from the current configuration
    ///
    /// # Panics
    ///
    /// Panics if a chain would reach [`MAX_PIPELINE_LEN`].
    pub fn rebuild_fallbacks(&mut self) {
        self.all_no_route = self.combine_handlers(&self.no_route);
        self.all_no_method = self.combine_handlers(&self.no_method);
    }

    fn combine_handlers(&self, handlers: &[HandlerFunc]) -> Vec<HandlerFunc> {
        let global = &self.groups[ROOT_GROUP].middlewares;
        let final_size = global.len() + handlers.len();
        assert!(
            final_size < MAX_PIPELINE_LEN,
            "too many handlers: {final_size} (limit {})",
            MAX_PIPELINE_LEN - 1
        );
        let mut merged = Vec::with_capacity(final_size);
        merged.extend(global.iter().cloned());
        merged.extend(handlers.iter().cloned());
        merged
    }

    pub(crate) fn no_route_handlers(&self) -> &[HandlerFunc] {
        &self.no_route
    }

    /// Middleware of every group whose prefix starts `path`, in group order
    fn middleware_for(&self, path: &str) -> Vec<HandlerFunc> {
        self.groups
            .iter()
            .filter(|g| path.starts_with(&g.prefix))
            .flat_map(|g| g.middlewares.iter().cloned())
            .collect()
    }

    // ---- routes ----------------------------------------------------------

    pub(crate) fn add_route_in(
        &mut self,
        group: usize,
        method: Method,
        relative: &str,
        handler: HandlerFunc,
    ) {
        let pattern = join_paths(&self.groups[group].prefix, relative);
        if let Err(err) = self.router.add_route(method, &pattern, handler) {
            panic!("{err}");
        }
    }

    pub(crate) fn static_in(&mut self, group: usize, relative: &str, fs: Arc<dyn FileSystem>) {
        assert!(
            !relative.contains(':') && !relative.contains('*'),
            "URL parameters can not be used when serving a static folder: {relative}"
        );
        let mount = join_paths(&self.groups[group].prefix, relative);
        let handler = static_handler(mount, fs);
        let pattern = join_paths(relative, "/*filepath");
        self.add_route_in(group, Method::Get, &pattern, Arc::clone(&handler));
        self.add_route_in(group, Method::Head, &pattern, handler);
    }

    /// Register `handler` for `method` + `pattern`
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern or a clashing variable segment.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.add_route_in(ROOT_GROUP, method, pattern, Arc::new(handler));
        self
    }

    /// Register a GET route
    ///
    /// # Panics
    ///
    /// See [`Engine::route`].
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
    /// See [`Engine::route`].
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
    /// See [`Engine::route`].
    pub fn head<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.route(Method::Head, pattern, handler)
    }

    /// Serve files under directory `root` at `relative_path/*filepath`
    ///
    /// # Panics
    ///
    /// Panics if `relative_path` contains `:` or `*`.
    pub fn static_dir(&mut self, relative_path: &str, root: impl AsRef<Path>) -> &mut Self {
        self.static_in(ROOT_GROUP, relative_path, Arc::new(Dir::new(root.as_ref())));
        self
    }

    /// Serve files from `fs` at `relative_path/*filepath`
    ///
    /// # Panics
    ///
    /// Panics if `relative_path` contains `:` or `*`.
    pub fn static_fs(&mut self, relative_path: &str, fs: impl FileSystem + 'static) -> &mut Self {
        self.static_in(ROOT_GROUP, relative_path, Arc::new(fs));
        self
    }

    /// Every registered route
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router.routes()
    }

    // ---- templates -------------------------------------------------------

    /// Load every `*.html` template below `dir`
    ///
    /// # Errors
    ///
    /// See [`Templates::load_dir`].
    pub fn load_html_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        self.templates.load_dir(dir)
    }

    /// Register one template from source
    ///
    /// # Errors
    ///
    /// See [`Templates::add_template`].
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.templates.add_template(name, source)
    }

    /// Templates used by `Context::html`
    #[must_use]
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Mutable templates, for registering functions and filters
    pub fn templates_mut(&mut self) -> &mut Templates {
        &mut self.templates
    }

    // ---- serving ---------------------------------------------------------

    /// Run the pipeline for one request
    pub fn handle(&self, request: Request) -> Response {
        let method = request.method;
        let path = request.path.clone();
        let mut ctx = Context::new(self, request);

        if let Some(route) = self.router.get_route(method, &path) {
            let mut handlers = self.middleware_for(&path);
            handlers.push(Arc::clone(route.value));
            ctx.set_route(route.pattern, route.params);
            ctx.set_handlers(handlers);
        } else {
            let allowed = if self.config.handle_method_not_allowed {
                self.router.allowed_methods(&path, method)
            } else {
                Vec::new()
            };

            if allowed.is_empty() {
                trace!(method = %method, path = %path, "No route matched");
                ctx.status(404);
                ctx.fallback = Some(404);
                ctx.set_handlers(self.all_no_route.clone());
            } else {
                trace!(method = %method, path = %path, "Method not allowed");
                let allow: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                ctx.set_header("Allow", &allow.join(", "));
                ctx.status(405);
                ctx.fallback = Some(405);
                ctx.set_handlers(self.all_no_method.clone());
            }
        }

        ctx.next();

        if let Some(code) = ctx.fallback {
            if !ctx.response().is_written() && ctx.response().status() == code {
                let body = if code == 405 {
                    DEFAULT_405_BODY
                } else {
                    DEFAULT_404_BODY
                };
                ctx.string(code, body);
            }
        }
        ctx.into_response()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &self.router.routes().len())
            .field("groups", &self.groups.len())
            .field("no_route", &self.no_route.len())
            .field("no_method", &self.no_method.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Join a group prefix and a relative path into an absolute path
///
/// Duplicate separators, `.` and `..` are cleaned up; a trailing slash on
/// `relative` is kept. An empty `relative` returns `absolute` unchanged.
#[must_use]
pub fn join_paths(absolute: &str, relative: &str) -> String {
    if relative.is_empty() {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = Vec::new();
    for seg in absolute.split('/').chain(relative.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    let mut joined = format!("/{}", parts.join("/"));
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}
