//! # HTTP Response
//!
//! Buffered response written by handlers through the [`Context`].
//!
//! Nothing reaches the socket until the pipeline has finished, so a handler
//! that fails late can still replace what earlier handlers wrote.
//!
//! [`Context`]: crate::context::Context

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::StatusCode;
use tracing::warn;

/// Response under construction
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }
}

impl Response {
    /// Empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Set the status code; out-of-range codes become 500
    pub fn set_status(&mut self, code: u16) {
        self.status = StatusCode::from_u16(code).unwrap_or_else(|_| {
            warn!(code, "Invalid status code, using 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
    }

    /// Header value by name, if present and valid UTF-8
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set or override a header; invalid names or values are dropped
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    /// Append raw bytes to the body
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
        self.written = true;
    }

    /// Discard whatever body has been written so far
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    /// Body written so far
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy)
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// True once any handler has written to the body
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Convert to hyper Response
    #[must_use]
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let len = self.body.len();
        let mut response = hyper::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ok_and_unwritten() {
        let resp = Response::new();
        assert_eq!(resp.status(), 200);
        assert!(!resp.is_written());
        assert!(resp.body().is_empty());
    }

    #[test]
    fn test_writes_append() {
        let mut resp = Response::new();
        resp.write(b"hello, ");
        resp.write(b"world");
        assert_eq!(resp.body_string(), "hello, world");
        assert!(resp.is_written());
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let mut resp = Response::new();
        resp.set_status(1000);
        assert_eq!(resp.status(), 500);
    }

    #[test]
    fn test_invalid_header_is_dropped() {
        let mut resp = Response::new();
        resp.set_header("bad header", "x");
        resp.set_header("X-Ok", "yes");
        assert_eq!(resp.headers().len(), 1);
        assert_eq!(resp.header("x-ok"), Some("yes"));
    }

    #[test]
    fn test_into_hyper() {
        let mut resp = Response::new();
        resp.set_status(404);
        resp.set_header("Content-Type", "text/plain");
        resp.write(b"nope");
        let hyper_resp = resp.into_hyper();
        assert_eq!(hyper_resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(hyper_resp.headers()["content-type"], "text/plain");
        assert_eq!(hyper_resp.headers()["content-length"], "4");
    }
}
