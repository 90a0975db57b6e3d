use std::collections::HashMap;

use bytes::Bytes;
use memchr::memmem;
use thiserror::Error;

use crate::context::Context;
use crate::http::request::Request;

const MAX_REQUEST_LINE_BYTES: usize = 4096;
const MAX_HEADERS_BYTES: usize = 16 * 1024;
const MAX_HEADER_COUNT: usize = 50;
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Errors produced while parsing an HTTP request from a byte buffer.
///
/// The incomplete variants mean more bytes may complete the request; every
/// other variant is a protocol violation the connection cannot recover
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input buffer has no bytes.
    #[error("empty request")]
    Empty,
    /// The header terminator has not arrived yet.
    #[error("incomplete request")]
    IncompleteRequest,
    /// The body is shorter than Content-Length so far.
    #[error("incomplete body")]
    IncompleteBody,
    /// The request line is not `METHOD SP TARGET SP VERSION`.
    #[error("malformed request line")]
    MalformedRequestLine,
    /// The version token is neither `HTTP/1.1` nor `HTTP/1.0`.
    #[error("invalid HTTP version")]
    InvalidVersion,
    /// A header line is missing a colon or has an empty name.
    #[error("invalid header")]
    InvalidHeader,
    /// Content-Length is empty, non-decimal, negative, or conflicting.
    #[error("invalid Content-Length")]
    InvalidContentLength,
    /// The request line exceeds 4096 bytes.
    #[error("request line too long")]
    RequestLineTooLong,
    /// The header block exceeds 16384 bytes.
    #[error("headers too large")]
    HeadersTooLarge,
    /// More than 50 headers were supplied.
    #[error("too many headers")]
    TooManyHeaders,
    /// Content-Length exceeds 262144 bytes.
    #[error("body too large")]
    BodyTooLarge,
}

impl ParseError {
    /// Reports whether more bytes may complete the request.
    pub fn is_incomplete(self) -> bool {
        matches!(self, ParseError::IncompleteRequest | ParseError::IncompleteBody)
    }
}

/// Parses one HTTP request from the front of `buf`.
///
/// Pure function of the input: no I/O, no allocation beyond the returned
/// request's headers and body copy. Returns the request and the number of
/// bytes consumed, so callers can slice the buffer and parse the next
/// pipelined request.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }

    let (header_end, delimiter_len) = match find_header_delimiter(buf) {
        Some(found) => found,
        None => {
            if buf.len() > MAX_HEADERS_BYTES {
                return Err(ParseError::HeadersTooLarge);
            }
            return Err(ParseError::IncompleteRequest);
        }
    };
    if header_end > MAX_HEADERS_BYTES {
        return Err(ParseError::HeadersTooLarge);
    }

    let head = std::str::from_utf8(&buf[..header_end])
        .map_err(|_| ParseError::MalformedRequestLine)?;
    let normalized = head.replace("\r\n", "\n");
    let mut lines = normalized.split('\n');

    let request_line = lines
        .by_ref()
        .find(|line| !line.trim().is_empty())
        .ok_or(ParseError::MalformedRequestLine)?;
    if request_line.len() > MAX_REQUEST_LINE_BYTES {
        return Err(ParseError::RequestLineTooLong);
    }
    let (method, path, version) = parse_request_line(request_line)?;

    let mut headers = HashMap::new();
    let mut header_count = 0;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        header_count += 1;
        if header_count > MAX_HEADER_COUNT {
            return Err(ParseError::TooManyHeaders);
        }

        let colon = match line.find(':') {
            Some(0) | None => return Err(ParseError::InvalidHeader),
            Some(pos) => pos,
        };

        let key = line[..colon].trim().to_ascii_lowercase();
        let value = line[colon + 1..].trim().to_string();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        // Conflicting repeated Content-Length values are rejected rather
        // than silently letting the last one win.
        if key == "content-length" {
            if let Some(previous) = headers.get("content-length") {
                if *previous != value {
                    return Err(ParseError::InvalidContentLength);
                }
            }
        }

        headers.insert(key, value);
    }

    let body_start = header_end + delimiter_len;

    let mut content_length = 0;
    if let Some(raw_len) = headers.get("content-length") {
        if raw_len.is_empty() {
            return Err(ParseError::InvalidContentLength);
        }
        let n: usize = raw_len
            .parse()
            .map_err(|_| ParseError::InvalidContentLength)?;
        if n > MAX_BODY_BYTES {
            return Err(ParseError::BodyTooLarge);
        }
        content_length = n;
    }

    if buf.len() - body_start < content_length {
        return Err(ParseError::IncompleteBody);
    }

    let body = Bytes::copy_from_slice(&buf[body_start..body_start + content_length]);

    let request = Request {
        ctx: Context::new(),
        method: method.to_string(),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
    };

    Ok((request, body_start + content_length))
}

/// Locates the end of the header block and the terminator length.
///
/// Both `\r\n\r\n` and `\n\n` terminate headers; whichever starts earlier
/// wins.
fn find_header_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = memmem::find(buf, b"\r\n\r\n");
    let lf = memmem::find(buf, b"\n\n");

    match (crlf, lf) {
        (Some(c), Some(l)) if c < l => Some((c, 4)),
        (Some(_), Some(l)) => Some((l, 2)),
        (Some(c), None) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}

/// Splits and validates an HTTP request line.
fn parse_request_line(line: &str) -> Result<(&str, &str, &str), ParseError> {
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let path = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let version = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    if parts.next().is_some() {
        return Err(ParseError::MalformedRequestLine);
    }

    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(ParseError::InvalidVersion);
    }

    Ok((method, path, version))
}
