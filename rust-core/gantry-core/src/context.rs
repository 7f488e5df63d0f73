//! # Request Context
//!
//! Per-request state threaded through the handler pipeline.
//!
//! ## Execution model
//!
//! The pipeline is an ordered list of handlers plus a cursor that starts at
//! `-1`. [`Context::next`] advances the cursor and runs every remaining
//! handler in turn. A handler that calls `next` itself runs the rest of the
//! chain from inside its own frame, and its code after that call is its
//! "after" logic, which gives the usual onion ordering. A handler that never
//! calls `next` still hands over to the following one, because the loop
//! that invoked it keeps going. Either way each handler runs at most once.
//!
//! Aborting moves the cursor to the pipeline length. Every loop still on
//! the stack sees the cursor at or past the end and stops, while the "after"
//! code of handlers already entered still runs as their frames unwind.

use crate::engine::Engine;
use crate::json::to_json_vec;
use crate::request::Request;
use crate::response::Response;
use crate::router::Method;
use crate::state::TypeState;
use crate::trie::Params;
use serde::Serialize;
use serde_json::json;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::{debug, error};

/// A pipeline stage: middleware, route handler or fallback handler
pub type HandlerFunc = Arc<dyn Fn(&mut Context<'_>) + Send + Sync>;

/// Wrap a closure or function as a [`HandlerFunc`]
pub fn handler<F>(f: F) -> HandlerFunc
where
    F: Fn(&mut Context<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-request mutable state
pub struct Context<'e> {
    request: Request,
    response: Response,
    params: Params,
    full_path: Option<String>,
    handlers: Vec<HandlerFunc>,
    index: isize,
    aborted: bool,
    /// Status of the fallback chain this request was routed into, if any
    pub(crate) fallback: Option<u16>,
    state: TypeState,
    engine: &'e Engine,
}

impl<'e> Context<'e> {
    pub(crate) fn new(engine: &'e Engine, request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            params: Params::new(),
            full_path: None,
            handlers: Vec::new(),
            index: -1,
            aborted: false,
            fallback: None,
            state: TypeState::new(),
            engine,
        }
    }

    pub(crate) fn set_route(&mut self, pattern: &str, params: Params) {
        self.full_path = Some(pattern.to_string());
        self.params = params;
    }

    pub(crate) fn set_handlers(&mut self, handlers: Vec<HandlerFunc>) {
        self.handlers = handlers;
        self.index = -1;
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }

    fn pipeline_len(&self) -> isize {
        isize::try_from(self.handlers.len()).unwrap_or(isize::MAX)
    }

    // ---- execution -------------------------------------------------------

    /// Run the remaining handlers
    ///
    /// Middleware calls this to yield to the rest of the chain; whatever it
    /// does afterwards runs once the downstream handlers have finished.
    pub fn next(&mut self) {
        self.index += 1;
        while self.index < self.pipeline_len() {
            let Ok(i) = usize::try_from(self.index) else {
                break;
            };
            let handler = Arc::clone(&self.handlers[i]);
            handler(self);
            self.index += 1;
        }
    }

    /// Stop the pipeline; handlers after the current one are not invoked
    pub fn abort(&mut self) {
        self.index = self.pipeline_len();
        self.aborted = true;
    }

    /// Abort and set the status code, leaving the body alone
    pub fn abort_with_status(&mut self, code: u16) {
        self.abort();
        self.status(code);
    }

    /// Abort with a JSON error body `{"message": ...}`
    ///
    /// Anything already written to the body is discarded.
    pub fn fail(&mut self, code: u16, message: impl AsRef<str>) {
        self.abort();
        self.response.clear_body();
        self.json(code, &json!({ "message": message.as_ref() }));
    }

    /// True once `abort`, `abort_with_status` or `fail` has been called
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Swap the pipeline for the engine's not-found chain and restart it
    ///
    /// Called from inside a running handler: the enclosing `next` loop
    /// moves the cursor from `-1` to the first not-found handler when that
    /// handler returns. Middleware already ran for this request, so the raw
    /// `NoRoute` handlers are used, not the combined chain.
    pub(crate) fn redirect_to_no_route(&mut self) {
        self.status(404);
        self.fallback = Some(404);
        self.handlers = self.engine.no_route_handlers().to_vec();
        self.index = -1;
    }

    // ---- request ---------------------------------------------------------

    /// The request being served
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Request method
    #[must_use]
    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Request path, without query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Pattern of the matched route, e.g. `/user/:id`
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    /// Captured path parameter, or `""` if the route has no such variable
    ///
    /// The value is the raw path segment; it is not URL-decoded.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }

    /// All captured path parameters
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// URL-decoded query parameter, or `""`
    #[must_use]
    pub fn query(&self, key: &str) -> &str {
        self.request.query(key).unwrap_or("")
    }

    /// Form field from a urlencoded body (falling back to the query), or `""`
    #[must_use]
    pub fn post_form(&self, key: &str) -> String {
        self.request.form_value(key).unwrap_or_default()
    }

    /// Request header value
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    // ---- per-request values ----------------------------------------------

    /// Store a value for later handlers in this pipeline
    pub fn set_value<T: Send + Sync + 'static>(&mut self, value: T) {
        self.state.set(value);
    }

    /// Value stored by an earlier handler
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state.get::<T>()
    }

    // ---- response --------------------------------------------------------

    /// The response written so far
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Mutable access to the response
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Set the status code
    pub fn status(&mut self, code: u16) {
        self.response.set_status(code);
    }

    /// Set or override a response header
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.response.set_header(key, value);
    }

    /// Set headers that are not already present
    pub fn set_headers(&mut self, headers: &[(&str, &str)]) {
        for (k, v) in headers {
            if self.response.header(k).is_none() {
                self.response.set_header(k, v);
            }
        }
    }

    /// Plain-text body
    pub fn string(&mut self, code: u16, body: impl AsRef<str>) {
        self.set_header("Content-Type", "text/plain");
        self.status(code);
        self.response.write(body.as_ref().as_bytes());
    }

    /// JSON body
    ///
    /// A value that fails to serialize produces a 500 with the serializer's
    /// message instead.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, obj: &T) {
        match to_json_vec(obj) {
            Ok(bytes) => {
                self.set_header("Content-Type", "application/json");
                self.set_headers(&[("Access-Control-Allow-Origin", "*")]);
                self.status(code);
                self.response.write(&bytes);
            }
            Err(err) => {
                error!(path = %self.request.path, error = %err, "JSON serialization failed");
                self.response.clear_body();
                self.string(500, err.to_string());
            }
        }
    }

    /// Raw bytes, content type left to the caller
    pub fn data(&mut self, code: u16, data: &[u8]) {
        self.status(code);
        self.response.write(data);
    }

    /// Copy a reader into the body
    ///
    /// `content_type` is only applied if no `Content-Type` was set yet, and
    /// `extra_headers` only fill headers that are absent. A read failure is
    /// logged and turned into `fail(500, ..)`, so a partially copied body is
    /// never sent.
    pub fn data_from_reader<R: Read>(
        &mut self,
        code: u16,
        content_type: &str,
        mut reader: R,
        extra_headers: &[(&str, &str)],
    ) {
        self.status(code);
        self.set_headers(&[("Content-Type", content_type)]);
        self.set_headers(extra_headers);

        let mut buf = Vec::new();
        match reader.read_to_end(&mut buf) {
            Ok(_) => self.response.write(&buf),
            Err(err) => {
                error!(path = %self.request.path, error = %err, "Reader failed while streaming response");
                self.fail(500, format!("reader error: {err}"));
            }
        }
    }

    /// Serve a file from the local filesystem
    pub fn file(&mut self, file_path: &str) {
        match std::fs::read(file_path) {
            Ok(bytes) => {
                let content_type = crate::static_files::content_type_for(file_path);
                self.set_header("Content-Type", content_type);
                self.data(200, &bytes);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(file = %file_path, "File not found");
                self.fail(404, "file not found");
            }
            Err(err) => {
                error!(file = %file_path, error = %err, "Failed to read file");
                self.fail(500, err.to_string());
            }
        }
    }

    /// Render a named template
    ///
    /// Render failures abort the pipeline with a 500 JSON error.
    pub fn html<T: Serialize>(&mut self, code: u16, name: &str, data: T) {
        match self.engine.templates().render(name, data) {
            Ok(body) => {
                self.set_header("Content-Type", "text/html");
                self.status(code);
                self.response.write(body.as_bytes());
            }
            Err(err) => {
                error!(template = %name, error = %err, "Template render failed");
                self.fail(500, err.to_string());
            }
        }
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("params", &self.params)
            .field("handlers", &self.handlers.len())
            .field("index", &self.index)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}
