//! # Error Handling
//!
//! Centralized error types for Gantry core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Route misses are not errors: the router reports them as `None` and the
//! engine dispatches the fallback pipeline. Setup mistakes (bad patterns,
//! oversized pipelines) panic at registration time instead of surfacing here.

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Result type alias for Gantry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Gantry runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Request method the router has no table for
    #[error("Unsupported HTTP method: {method}")]
    UnsupportedMethod {
        /// The method as received
        method: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request body could not be decoded
    #[error("Bind error: {message}")]
    Bind {
        /// Decoder message
        message: String,
    },

    /// Decoded body failed validation
    #[error("Validation failed: {}", .0.to_json())]
    Validation(ValidationErrors),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template lookup or rendering failed
    #[error("Template error: {message}")]
    Template {
        /// Error message from the template engine
        message: String,
    },

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Self::Template {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;

    #[test]
    fn test_invalid_pattern_error() {
        let err = Error::InvalidRoutePattern {
            pattern: "/a/*rest/b".to_string(),
            reason: "wildcard must be the last segment".to_string(),
        };
        assert!(err.to_string().contains("/a/*rest/b"));
        assert!(err.to_string().contains("last segment"));
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "0.0.0.0:8000".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("0.0.0.0:8000"));
    }

    #[test]
    fn test_validation_error_renders_fields() {
        let mut errors = ValidationErrors::new();
        errors.add(FieldError::required("name"));
        let err = Error::Validation(errors);
        assert!(err.to_string().contains("name"));
    }
}
