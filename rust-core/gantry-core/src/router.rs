//! # Router
//!
//! One [`Trie`] per HTTP method. Built incrementally at startup and only
//! read while serving, so lookups need no locking as long as registration
//! finishes before the first request arrives.
//!
//! The router is generic over the stored value: the engine stores handler
//! functions, tests can store plain integers.

use crate::error::{Error, Result};
use crate::route::RouteInfo;
use crate::trie::{RouteMatch, Trie};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Every method, in a stable order
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
    ];

    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnsupportedMethod {
                method: s.to_string(),
            })
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = Error;

    fn try_from(method: &hyper::Method) -> Result<Self> {
        match *method {
            hyper::Method::GET => Ok(Self::Get),
            hyper::Method::POST => Ok(Self::Post),
            hyper::Method::PUT => Ok(Self::Put),
            hyper::Method::DELETE => Ok(Self::Delete),
            hyper::Method::PATCH => Ok(Self::Patch),
            hyper::Method::HEAD => Ok(Self::Head),
            hyper::Method::OPTIONS => Ok(Self::Options),
            _ => Err(Error::UnsupportedMethod {
                method: method.to_string(),
            }),
        }
    }
}

/// Method-keyed collection of route tries
#[derive(Debug, Clone)]
pub struct Router<T> {
    roots: HashMap<Method, Trie<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self {
            roots: HashMap::new(),
        }
    }

    /// Register a value for `method` + `pattern`
    ///
    /// Patterns use `/literal`, `/:param` and a trailing `/*rest`.
    /// Re-registering a pattern replaces the previous value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// clashes with an existing variable segment.
    pub fn add_route(&mut self, method: Method, pattern: &str, value: T) -> Result<()> {
        self.roots
            .entry(method)
            .or_default()
            .try_insert(pattern, value)?;
        debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(())
    }

    /// Match a request path against the routes registered for `method`
    ///
    /// `None` is the normal not-found outcome.
    #[must_use]
    pub fn get_route<'r>(&'r self, method: Method, path: &str) -> Option<RouteMatch<'r, T>> {
        self.roots.get(&method)?.search(path)
    }

    /// Methods, other than `except`, under which `path` resolves to a route
    #[must_use]
    pub fn allowed_methods(&self, path: &str, except: Method) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| *m != except)
            .filter(|m| self.get_route(*m, path).is_some())
            .collect()
    }

    /// Every registered route, sorted by method then pattern
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes: Vec<RouteInfo> = self
            .roots
            .iter()
            .flat_map(|(method, trie)| {
                trie.patterns()
                    .into_iter()
                    .map(|pattern| RouteInfo::new(*method, pattern))
            })
            .collect();
        routes.sort();
        routes
    }

    /// Convenience method to add a GET route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn get(&mut self, pattern: &str, value: T) -> Result<()> {
        self.add_route(Method::Get, pattern, value)
    }

    /// Convenience method to add a POST route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn post(&mut self, pattern: &str, value: T) -> Result<()> {
        self.add_route(Method::Post, pattern, value)
    }

    /// Convenience method to add a HEAD route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn head(&mut self, pattern: &str, value: T) -> Result<()> {
        self.add_route(Method::Head, pattern, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.get("/", 0).unwrap();
        router.get("/users", 1).unwrap();
        router.post("/users", 2).unwrap();

        assert_eq!(router.get_route(Method::Get, "/").unwrap().value, &0);
        assert_eq!(router.get_route(Method::Get, "/users").unwrap().value, &1);
        assert_eq!(router.get_route(Method::Post, "/users").unwrap().value, &2);
    }

    #[test]
    fn test_path_parameters() {
        let mut router = Router::new();
        router.get("/users/:id", 0).unwrap();
        router.get("/users/:id/posts/:post_id", 1).unwrap();

        let m = router.get_route(Method::Get, "/users/123").unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("123"));

        let m = router.get_route(Method::Get, "/users/456/posts/789").unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("456"));
        assert_eq!(m.params.get("post_id").map(String::as_str), Some("789"));
    }

    #[test]
    fn test_route_not_found() {
        let router: Router<()> = Router::new();
        assert!(router.get_route(Method::Get, "/nonexistent").is_none());
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.get("/users", ()).unwrap();

        assert!(router.get_route(Method::Post, "/users").is_none());
        assert_eq!(router.allowed_methods("/users", Method::Post), vec![Method::Get]);
        assert!(router.allowed_methods("/users", Method::Get).is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut router = Router::new();
        let result = router.get("/files/*path/meta", ());
        assert!(matches!(result, Err(Error::InvalidRoutePattern { .. })));
    }

    #[test]
    fn test_routes_listing() {
        let mut router = Router::new();
        router.post("/b", ()).unwrap();
        router.get("/a/:id", ()).unwrap();
        router.head("/a/:id", ()).unwrap();

        let routes: Vec<String> = router.routes().iter().map(ToString::to_string).collect();
        assert_eq!(routes, vec!["GET /a/:id", "POST /b", "HEAD /a/:id"]);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert!("BREW".parse::<Method>().is_err());
        assert_eq!(Method::try_from(&hyper::Method::HEAD).unwrap(), Method::Head);
        assert!(Method::try_from(&hyper::Method::TRACE).is_err());
    }
}
