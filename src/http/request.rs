use std::collections::HashMap;

use bytes::Bytes;

use crate::context::Context;

/// A parsed HTTP/1.1 request.
///
/// `method` keeps its original case; routing uppercases it at lookup time.
/// `path` is the raw request-target, query string included. Header names
/// are lowercased and values trimmed by the parser; duplicates are
/// last-write-wins. `body` holds exactly `Content-Length` bytes.
#[derive(Debug, Clone)]
pub struct Request {
    pub ctx: Context,
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl Request {
    /// Returns a header value by its lowercased name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

/// Fluent constructor for requests, mostly useful in tests and adapters.
pub struct RequestBuilder {
    method: String,
    path: String,
    version: String,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl RequestBuilder {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: "HTTP/1.1".to_string(),
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds a header; the key is lowercased to match parser output.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request {
            ctx: Context::new(),
            method: self.method,
            path: self.path,
            version: self.version,
            headers: self.headers,
            body: self.body,
        }
    }
}
