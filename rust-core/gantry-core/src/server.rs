//! # HTTP Server
//!
//! Hyper + Tokio front end for a frozen [`Engine`].
//!
//! ## Key Features
//!
//! - HTTP/1 by default, HTTP/1 + h2c auto-detection when enabled
//! - Request bodies collected up front with a size limit
//! - Handlers run on the blocking pool, since they are synchronous
//! - Graceful shutdown: stop accepting, then drain active connections

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::request::Request;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// HTTP server around a shared engine
#[derive(Debug)]
pub struct Server {
    engine: Arc<Engine>,
    config: ServerConfig,
}

impl Server {
    /// Serve `engine` with the default configuration
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self::with_config(engine, ServerConfig::default())
    }

    /// Serve `engine` with `config`
    #[must_use]
    pub fn with_config(engine: Engine, config: ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The engine requests are dispatched to
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Bind the configured address and serve until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound and
    /// `Error::Io` if accepting fails.
    pub async fn serve(&self) -> Result<()> {
        let listener = bind_listener(self.config.address)?;
        self.serve_listener(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `signal` resolves
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if accepting fails.
    pub async fn serve_listener<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, h2c = self.config.use_h2c, "Server listening");
        }

        let active = Arc::new(AtomicUsize::new(0));
        tokio::pin!(signal);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);
                    let engine = Arc::clone(&self.engine);
                    let active = Arc::clone(&active);
                    let config = self.config.clone();

                    active.fetch_add(1, Ordering::Relaxed);
                    tokio::task::spawn(async move {
                        let max_body_size = config.max_body_size;
                        let service = service_fn(move |req| {
                            let engine = Arc::clone(&engine);
                            async move {
                                Ok::<_, Infallible>(
                                    handle_request(req, engine, remote_addr, max_body_size).await,
                                )
                            }
                        });

                        if config.use_h2c {
                            let mut builder = auto::Builder::new(TokioExecutor::new());
                            builder.http1().keep_alive(config.keep_alive);
                            if let Err(err) = builder.serve_connection(io, service).await {
                                error!(remote = %remote_addr, error = %err, "Error serving connection");
                            }
                        } else if let Err(err) = http1::Builder::new()
                            .keep_alive(config.keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!(remote = %remote_addr, error = %err, "Error serving connection");
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut signal => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            warn!(
                remaining = active.load(Ordering::Relaxed),
                "Shutdown timeout elapsed with connections still open"
            );
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Bind a listening socket with address reuse enabled
///
/// # Errors
///
/// Returns `Error::BindError` naming the address on any socket failure.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let bind_error = |source| Error::BindError {
        address: addr.to_string(),
        source,
    };
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()
    } else {
        tokio::net::TcpSocket::new_v6()
    }
    .map_err(bind_error)?;
    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(1024).map_err(bind_error)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to install ctrl-c handler; serving until killed");
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    req: hyper::Request<Incoming>,
    engine: Arc<Engine>,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> hyper::Response<Full<Bytes>> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let version = req.version();

    let response = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(mut request) => {
            request.remote_addr = Some(remote_addr);
            match tokio::task::spawn_blocking(move || engine.handle(request)).await {
                Ok(response) => response.into_hyper(),
                Err(err) => {
                    error!(method = %method, path = %path, error = %err, "Request task failed");
                    plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            }
        }
        Err(Error::PayloadTooLarge { limit, actual }) => {
            warn!(method = %method, path = %path, limit, actual, "Request body too large");
            plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
        }
        Err(Error::UnsupportedMethod { method }) => {
            warn!(method = %method, path = %path, "Unsupported method");
            plain(StatusCode::NOT_IMPLEMENTED, "Not Implemented")
        }
        Err(err) => {
            warn!(method = %method, path = %path, error = %err, "Failed to read request");
            plain(StatusCode::BAD_REQUEST, "Bad Request")
        }
    };

    info!(
        remote = %remote_addr,
        method = %method,
        path = %path,
        version = ?version,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Request served"
    );
    response
}

fn plain(status: StatusCode, body: &'static str) -> hyper::Response<Full<Bytes>> {
    let mut response = hyper::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
