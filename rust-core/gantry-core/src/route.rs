//! # Route Metadata
//!
//! Read-only description of a registered route, used for listing the
//! routing table (startup logs, debugging endpoints).

use crate::router::Method;
use crate::trie::parse_pattern;
use std::fmt;

/// A registered method + pattern pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteInfo {
    /// HTTP method the route answers
    pub method: Method,
    /// Absolute pattern as registered (e.g., "/users/:id")
    pub pattern: String,
}

impl RouteInfo {
    /// Create a new `RouteInfo`
    #[must_use]
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
        }
    }

    /// Names of the variable segments, in order, without their sigils
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        parse_pattern(&self.pattern)
            .unwrap_or_default()
            .into_iter()
            .filter(|s| s.starts_with(':') || s.starts_with('*'))
            .map(|s| &s[1..])
            .collect()
    }

    /// Whether the route ends in a catch-all segment
    #[must_use]
    pub fn has_catch_all(&self) -> bool {
        parse_pattern(&self.pattern)
            .ok()
            .and_then(|parts| parts.last().map(|p| p.starts_with('*')))
            .unwrap_or(false)
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_info_simple() {
        let info = RouteInfo::new(Method::Get, "/users");
        assert_eq!(info.to_string(), "GET /users");
        assert!(info.param_names().is_empty());
        assert!(!info.has_catch_all());
    }

    #[test]
    fn test_route_info_params() {
        let info = RouteInfo::new(Method::Get, "/users/:id/files/*path");
        assert_eq!(info.param_names(), vec!["id", "path"]);
        assert!(info.has_catch_all());
    }
}
