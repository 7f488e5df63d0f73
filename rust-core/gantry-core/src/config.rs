//! # Configuration
//!
//! Plain structs with defaults, optionally overlaid from `GANTRY_*`
//! environment variables. Invalid values are logged and ignored.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
    /// Accept HTTP/2 prior-knowledge cleartext next to HTTP/1
    pub use_h2c: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
            use_h2c: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with the process environment
    ///
    /// Reads `GANTRY_ADDR`, `GANTRY_MAX_BODY_SIZE`,
    /// `GANTRY_SHUTDOWN_TIMEOUT_SECS` and `GANTRY_USE_H2C`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = parse_var(&lookup, "GANTRY_ADDR") {
            config.address = addr;
        }
        if let Some(size) = parse_var(&lookup, "GANTRY_MAX_BODY_SIZE") {
            config.max_body_size = size;
        }
        if let Some(secs) = parse_var(&lookup, "GANTRY_SHUTDOWN_TIMEOUT_SECS") {
            config.shutdown_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("GANTRY_USE_H2C") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.use_h2c = true,
                "0" | "false" | "no" | "off" => config.use_h2c = false,
                _ => warn!(key = "GANTRY_USE_H2C", value = %raw, "Ignoring invalid config value"),
            }
        }
        config
    }

    /// Set the bind address
    #[must_use]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Set the max request body size
    #[must_use]
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite:dict.db` or `postgres://host/db`
    pub url: String,
    /// Maximum pool size; the pool default applies when unset
    pub max_connections: Option<u32>,
}

impl DatabaseConfig {
    /// Read `GANTRY_DATABASE_URL` and `GANTRY_DATABASE_MAX_CONNECTIONS`
    ///
    /// Returns `None` when no URL is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("GANTRY_DATABASE_URL").filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            max_connections: parse_var(&lookup, "GANTRY_DATABASE_MAX_CONNECTIONS"),
        })
    }
}

/// Behaviour switches for [`Engine`](crate::engine::Engine)
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Answer 405 (with an `Allow` header) when the path matches under a
    /// different method, instead of 404
    pub handle_method_not_allowed: bool,
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring invalid config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert!(config.keep_alive);
        assert!(!config.use_h2c);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_server_config_overlay() {
        let config = ServerConfig::from_lookup(env(&[
            ("GANTRY_ADDR", "0.0.0.0:9999"),
            ("GANTRY_MAX_BODY_SIZE", "2048"),
            ("GANTRY_SHUTDOWN_TIMEOUT_SECS", "5"),
            ("GANTRY_USE_H2C", "true"),
        ]));
        assert_eq!(config.address.port(), 9999);
        assert_eq!(config.max_body_size, 2048);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(config.use_h2c);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ServerConfig::from_lookup(env(&[
            ("GANTRY_ADDR", "not an address"),
            ("GANTRY_MAX_BODY_SIZE", "-1"),
            ("GANTRY_USE_H2C", "maybe"),
        ]));
        assert_eq!(config.address.port(), 8000);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(!config.use_h2c);
    }

    #[test]
    fn test_database_config() {
        assert!(DatabaseConfig::from_lookup(env(&[])).is_none());
        assert!(DatabaseConfig::from_lookup(env(&[("GANTRY_DATABASE_URL", " ")])).is_none());

        let config = DatabaseConfig::from_lookup(env(&[
            ("GANTRY_DATABASE_URL", "sqlite::memory:"),
            ("GANTRY_DATABASE_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.url, "sqlite::memory:");
        assert_eq!(config.max_connections, Some(4));
    }

    #[test]
    fn test_engine_config_default() {
        assert!(!EngineConfig::default().handle_method_not_allowed);
    }
}
