//! # Gantry Core
//!
//! Embeddable HTTP request router and middleware engine.
//!
//! ## Architecture
//!
//! Routes live in a per-method prefix tree. Groups attach middleware to a
//! path prefix. Each request gets a [`Context`] holding an ordered handler
//! pipeline and a cursor; middleware yields to the rest of the pipeline with
//! [`Context::next`] and can stop it with [`Context::abort`]. Unmatched
//! requests run configurable not-found / method-not-allowed chains.
//!
//! ## Modules
//!
//! - `trie` - Prefix tree with `:param` and `*wildcard` segments
//! - `router` - One trie per HTTP method
//! - `route` - Route metadata and information
//! - `engine` - Engine, fallback chains and per-request dispatch
//! - `group` - Route groups (prefix + scoped middleware)
//! - `context` - Per-request pipeline cursor and response helpers
//! - `request` / `response` - Owned request and buffered response
//! - `binding` - JSON body binding with validation
//! - `validation` - Structured validation errors
//! - `render` - HTML templates (minijinja)
//! - `static_files` - Static file mounts
//! - `middleware` - Logger, panic recovery, CORS
//! - `state` - Per-request typed values
//! - `database` - SQLx database connectivity (SQLite, PostgreSQL)
//! - `lookup` - Pronunciation lookup handlers over the database
//! - `server` - HTTP server built on Hyper
//! - `config` / `telemetry` - Settings and log setup
//! - `error` - Error types and handling

pub mod binding;
pub mod config;
pub mod context;
pub mod database;
pub mod engine;
pub mod error;
pub mod group;
pub mod json;
pub mod lookup;
pub mod middleware;
pub mod render;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod state;
pub mod static_files;
pub mod telemetry;
pub mod trie;
pub mod validation;

pub use config::{DatabaseConfig, EngineConfig, ServerConfig};
pub use context::{handler, Context, HandlerFunc};
pub use database::{DatabasePool, DbRow, DbValue};
pub use engine::{join_paths, Engine, MAX_PIPELINE_LEN};
pub use error::{Error, Result};
pub use group::RouterGroup;
pub use json::{parse_json, to_json};
pub use lookup::{Cantonese, LookupResponse, PronunciationStore};
pub use middleware::{logger, recovery, Cors};
pub use render::Templates;
pub use request::Request;
pub use response::Response;
pub use route::RouteInfo;
pub use router::{Method, Router};
pub use server::Server;
pub use state::TypeState;
pub use static_files::{Dir, FileSystem};
pub use telemetry::init_tracing;
pub use trie::{Params, RouteMatch, Trie};
pub use validation::{FieldError, Validate, ValidationCode, ValidationErrors, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
