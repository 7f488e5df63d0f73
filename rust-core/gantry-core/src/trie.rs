//! # Route Trie
//!
//! Segment-level prefix tree mapping path templates to values.
//!
//! Patterns are split on `/` with empty segments discarded, so `/user/:id`,
//! `user/:id` and `/user/:id/` all land on the same node. Three kinds of
//! segment are understood:
//!
//! - literal (`user`) matches itself
//! - named parameter (`:id`) matches exactly one segment
//! - wildcard (`*filepath`) matches one or more trailing segments and must
//!   be the last segment of its pattern
//!
//! Each node carries at most one variable (parameter or wildcard) child, kept
//! apart from its literal children. Lookups prefer literal children and only
//! try the variable child when the literal branch does not lead to a route.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Parameters captured while matching a path, keyed by name without sigil.
///
/// Values are the raw path substrings; nothing is URL-decoded here.
pub type Params = HashMap<String, String>;

/// Successful lookup: the stored value, its pattern and the captured params.
#[derive(Debug)]
pub struct RouteMatch<'t, T> {
    /// Value registered for the pattern
    pub value: &'t T,
    /// Pattern as originally registered
    pub pattern: &'t str,
    /// Captured parameters
    pub params: Params,
}

/// A registered route hanging off a terminal node.
#[derive(Debug, Clone)]
struct Leaf<T> {
    pattern: String,
    value: T,
}

/// One path-segment level of the trie.
#[derive(Debug, Clone)]
struct Node<T> {
    /// Segment text, sigil included for variable nodes. Empty for the root.
    segment: String,
    /// True for `:param` and `*wildcard` nodes.
    is_wild: bool,
    children: Vec<Node<T>>,
    wild_child: Option<Box<Node<T>>>,
    /// Set only where a registered route terminates.
    leaf: Option<Leaf<T>>,
}

impl<T> Node<T> {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            is_wild: segment.starts_with(':') || segment.starts_with('*'),
            children: Vec::new(),
            wild_child: None,
            leaf: None,
        }
    }

    fn is_catch_all(&self) -> bool {
        self.segment.starts_with('*')
    }

    /// Name of the captured parameter, without its sigil.
    fn param_name(&self) -> &str {
        &self.segment[1..]
    }

    fn child_mut(&mut self, pattern: &str, segment: &str) -> Result<&mut Self> {
        if segment.starts_with(':') || segment.starts_with('*') {
            let child = self
                .wild_child
                .get_or_insert_with(|| Box::new(Node::new(segment)));
            if child.segment != segment {
                return Err(Error::InvalidRoutePattern {
                    pattern: pattern.to_string(),
                    reason: format!(
                        "'{segment}' conflicts with existing wildcard '{}' at the same position",
                        child.segment
                    ),
                });
            }
            return Ok(&mut **child);
        }

        let idx = match self.children.iter().position(|c| c.segment == segment) {
            Some(idx) => idx,
            None => {
                self.children.push(Node::new(segment));
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[idx])
    }

    fn search<'n>(&'n self, parts: &[&str], params: &mut Params) -> Option<&'n Leaf<T>> {
        let Some((head, rest)) = parts.split_first() else {
            return self.leaf.as_ref();
        };

        if let Some(child) = self.children.iter().find(|c| c.segment == *head) {
            if let Some(leaf) = child.search(rest, params) {
                return Some(leaf);
            }
        }

        let wild = self.wild_child.as_deref()?;
        debug_assert!(wild.is_wild);
        if wild.is_catch_all() {
            let leaf = wild.leaf.as_ref()?;
            params.insert(wild.param_name().to_string(), parts.join("/"));
            return Some(leaf);
        }

        let leaf = wild.search(rest, params)?;
        params.insert(wild.param_name().to_string(), (*head).to_string());
        Some(leaf)
    }

    fn collect_patterns<'n>(&'n self, out: &mut Vec<&'n str>) {
        if let Some(leaf) = &self.leaf {
            out.push(&leaf.pattern);
        }
        for child in &self.children {
            child.collect_patterns(out);
        }
        if let Some(wild) = &self.wild_child {
            wild.collect_patterns(out);
        }
    }
}

/// Split a pattern into its non-empty segments and check its shape.
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` when a wildcard is not the final
/// segment or a `:`/`*` segment has no name.
pub fn parse_pattern(pattern: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    for (i, part) in parts.iter().enumerate() {
        let invalid = |reason: &str| Error::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        if (part.starts_with(':') || part.starts_with('*')) && part.len() == 1 {
            return Err(invalid("wildcards must be named with a non-empty name"));
        }
        if part.starts_with('*') && i + 1 != parts.len() {
            return Err(invalid("catch-all wildcard must be the last segment"));
        }
    }
    Ok(parts)
}

/// Prefix tree for a single HTTP method.
#[derive(Debug, Clone)]
pub struct Trie<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Trie<T> {
    /// Create an empty trie
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new(""),
            len: 0,
        }
    }

    /// Register `value` under `pattern`.
    ///
    /// Registering the same pattern twice replaces the earlier value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// declares a variable segment that clashes with one already registered
    /// at the same position under a different name. The trie is left
    /// untouched in the malformed case; a clash may leave empty prefix nodes
    /// behind, which never match anything.
    pub fn try_insert(&mut self, pattern: &str, value: T) -> Result<()> {
        let parts = parse_pattern(pattern)?;

        let mut node = &mut self.root;
        for part in parts {
            node = node.child_mut(pattern, part)?;
        }

        match &mut node.leaf {
            Some(leaf) => leaf.value = value,
            None => {
                node.leaf = Some(Leaf {
                    pattern: pattern.to_string(),
                    value,
                });
                self.len += 1;
            }
        }
        Ok(())
    }

    /// Register `value` under `pattern`, panicking on a malformed pattern.
    ///
    /// # Panics
    ///
    /// Panics where [`Trie::try_insert`] would return an error. Route tables
    /// are built at startup, so a bad pattern is a programming error.
    pub fn insert(&mut self, pattern: &str, value: T) {
        if let Err(err) = self.try_insert(pattern, value) {
            panic!("{err}");
        }
    }

    /// Look up a request path.
    ///
    /// Returns `None` when the path only reaches an intermediate node or no
    /// node at all.
    #[must_use]
    pub fn search<'t>(&'t self, path: &str) -> Option<RouteMatch<'t, T>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let leaf = self.root.search(&parts, &mut params)?;
        Some(RouteMatch {
            value: &leaf.value,
            pattern: &leaf.pattern,
            params,
        })
    }

    /// All registered patterns, literal branches before variable ones.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect_patterns(&mut out);
        out
    }

    /// Number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
