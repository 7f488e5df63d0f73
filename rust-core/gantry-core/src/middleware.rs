//! # Built-in Middleware
//!
//! Ready-made pipeline stages. Each one is a plain handler that calls
//! [`Context::next`] to run the rest of the pipeline and then does its
//! after-work, so ordering follows registration order like any other
//! middleware.

use crate::context::Context;
use crate::router::Method;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{error, info};

/// Request logger
///
/// Times the remainder of the pipeline and logs one line per request.
pub fn logger() -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    |ctx: &mut Context<'_>| {
        let start = Instant::now();
        ctx.next();

        let latency = start.elapsed();
        let request_id = ctx.header("x-request-id").unwrap_or("-");
        info!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = ctx.response().status(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            request_id = %request_id,
            "Request handled"
        );
    }
}

/// Panic recovery
///
/// Runs the remainder of the pipeline under `catch_unwind`. A panic is
/// logged and answered with `500 {"message":"Internal Server Error"}`.
pub fn recovery() -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    |ctx: &mut Context<'_>| {
        let outcome = catch_unwind(AssertUnwindSafe(|| ctx.next()));
        if let Err(payload) = outcome {
            error!(
                method = %ctx.method(),
                path = %ctx.path(),
                panic = %panic_message(payload.as_ref()),
                "Handler panicked"
            );
            ctx.fail(500, "Internal Server Error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Cross-Origin Resource Sharing headers
#[derive(Debug, Clone)]
pub struct Cors {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, PATCH, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

impl Cors {
    /// Permissive defaults: any origin, common methods and headers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set allowed origin
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Set allowed methods
    #[must_use]
    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.allow_methods = methods.into();
        self
    }

    /// Set allowed headers
    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    /// Get the Access-Control-Allow-Origin header value
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.allow_origin
    }

    /// Turn into a pipeline stage
    ///
    /// Headers are set before the rest of the pipeline runs so they survive
    /// an abort. `OPTIONS` preflights are answered with 204 and aborted.
    #[must_use]
    pub fn into_middleware(self) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
        move |ctx: &mut Context<'_>| {
            ctx.set_header("Access-Control-Allow-Origin", &self.allow_origin);
            ctx.set_header("Access-Control-Allow-Methods", &self.allow_methods);
            ctx.set_header("Access-Control-Allow-Headers", &self.allow_headers);
            if ctx.method() == Method::Options {
                ctx.abort_with_status(204);
            }
        }
    }
}
