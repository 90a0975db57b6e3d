/// A mutable HTTP response under construction.
///
/// Headers keep insertion order for deterministic wire output;
/// [`set_header`](Response::set_header) overwrites on an exact key match.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a response with status 200, no headers, and an empty body.
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn set_status(&mut self, code: u16) {
        self.status_code = code;
    }

    /// Sets a header value, replacing an existing exact-key match.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Returns a header value by exact key.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Replaces the body with a copy of the provided bytes.
    pub fn write_bytes(&mut self, body: &[u8]) {
        self.body = body.to_vec();
    }

    /// Replaces the body with the provided string.
    pub fn write_string(&mut self, body: &str) {
        self.body = body.as_bytes().to_vec();
    }

    /// Serializes the response to HTTP/1.1 wire format.
    ///
    /// A `Content-Length` header is appended iff none exists under a
    /// case-insensitive name match; a caller-supplied value is emitted
    /// verbatim.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + self.body.len());

        buf.extend_from_slice(b"HTTP/1.1 ");
        buf.extend_from_slice(self.status_code.to_string().as_bytes());
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(status_text(self.status_code).as_bytes());
        buf.extend_from_slice(b"\r\n");

        for (key, value) in &self.headers {
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        if !self.has_header_ignore_case("Content-Length") {
            buf.extend_from_slice(b"Content-Length: ");
            buf.extend_from_slice(self.body.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(&self.body);
        buf
    }

    fn has_header_ignore_case(&self, target: &str) -> bool {
        self.headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(target))
    }

    /// Creates a plain-text response with the given status and body.
    pub fn text(status_code: u16, body: &str) -> Self {
        let mut resp = Self::new();
        resp.set_status(status_code);
        resp.set_header("Content-Type", "text/plain");
        resp.write_string(body);
        resp
    }

    pub fn bad_request() -> Self {
        Self::text(400, "Bad Request")
    }

    pub fn not_found() -> Self {
        Self::text(404, "Not Found")
    }

    pub fn method_not_allowed(allowed: &[String]) -> Self {
        let mut resp = Self::text(405, "Method Not Allowed");
        resp.set_header("Allow", allowed.join(", "));
        resp
    }

    pub fn request_timeout() -> Self {
        Self::text(408, "Request Timeout")
    }

    pub fn internal_error() -> Self {
        Self::text(500, "Internal Server Error")
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the reason phrase for a status code.
pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
