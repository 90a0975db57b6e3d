use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use crate::context::Context;
use crate::http::parser::parse_http_request;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::router::Router;

const READ_CHUNK_SIZE: usize = 4096;

/// Owns one accepted connection and drives it to completion.
///
/// The engine alternates between a drain phase (parse as many buffered
/// requests as possible, responding to each in order) and a read phase
/// (pull more bytes from the socket). Keep-alive pipelining falls out of
/// the drain loop: the response for request *i* is fully written before
/// request *i+1* is parsed.
///
/// Read and write deadlines are armed once at connection start, not per
/// request, so a long keep-alive session runs down a single clock.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    router: Arc<Router>,
    ctx: Context,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates an engine for an accepted stream. Zero timeouts disable the
    /// corresponding deadline.
    pub fn new(
        stream: S,
        router: Arc<Router>,
        ctx: Context,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        let now = Instant::now();
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            router,
            ctx,
            read_deadline: read_timeout.filter(|t| !t.is_zero()).map(|t| now + t),
            write_deadline: write_timeout.filter(|t| !t.is_zero()).map(|t| now + t),
        }
    }

    /// Runs the connection until it closes.
    ///
    /// All failure handling is local: malformed input and socket errors
    /// end with a best-effort `400` and a close, a clean EOF with an empty
    /// buffer closes silently. Nothing escapes to the caller.
    pub async fn run(&mut self) {
        loop {
            // Drain phase: serve every complete request already buffered.
            while !self.buffer.is_empty() {
                match parse_http_request(&self.buffer) {
                    Ok((mut req, consumed)) => {
                        req.ctx = self.ctx.clone();
                        let close_after = should_close(&req);
                        tracing::debug!(
                            method = %req.method,
                            path = %req.path,
                            close_after,
                            "request parsed"
                        );

                        let mut resp = self.route_and_invoke(req).await;
                        resp.set_header(
                            "Connection",
                            if close_after { "close" } else { "keep-alive" },
                        );

                        if self.write_response(&resp).await.is_err() {
                            return;
                        }
                        self.buffer.advance(consumed);
                        if close_after {
                            return;
                        }
                    }
                    Err(err) if err.is_incomplete() => break,
                    Err(err) => {
                        tracing::debug!(error = %err, "malformed request");
                        let mut resp = Response::bad_request();
                        resp.set_header("Connection", "close");
                        let _ = self.write_response(&resp).await;
                        return;
                    }
                }
            }

            // Read phase: pull more bytes, honoring the read deadline.
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.read_deadline {
                Some(deadline) => match timeout_at(deadline, self.stream.read(&mut chunk)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::debug!("read deadline exceeded");
                        let mut resp = Response::bad_request();
                        resp.set_header("Connection", "close");
                        let _ = self.write_response(&resp).await;
                        return;
                    }
                },
                None => self.stream.read(&mut chunk).await,
            };

            match read {
                Ok(0) => {
                    if self.buffer.is_empty() {
                        tracing::debug!("peer closed connection");
                        return;
                    }
                    let mut resp = Response::bad_request();
                    resp.set_header("Connection", "close");
                    let _ = self.write_response(&resp).await;
                    return;
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(err) => {
                    tracing::debug!(error = %err, "read failed");
                    let mut resp = Response::bad_request();
                    resp.set_header("Connection", "close");
                    let _ = self.write_response(&resp).await;
                    return;
                }
            }
        }
    }

    /// Resolves the request against the router and invokes the wrapped
    /// handler, falling back to 405 (with `Allow`) or 404 on a miss.
    async fn route_and_invoke(&self, req: Request) -> Response {
        match self.router.resolve(&req.method, &req.path) {
            Some(handler) => handler(req).await,
            None => {
                let allowed = self.router.allowed_methods(&req.path);
                if !allowed.is_empty() {
                    Response::method_not_allowed(&allowed)
                } else {
                    Response::not_found()
                }
            }
        }
    }

    async fn write_response(&mut self, resp: &Response) -> std::io::Result<()> {
        let bytes = resp.serialize();
        let deadline = self.write_deadline;

        let write = async {
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await
        };

        match deadline {
            Some(deadline) => match timeout_at(deadline, write).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "write deadline exceeded",
                )),
            },
            None => write.await,
        }
    }
}

/// Decides whether the connection must close after responding.
///
/// HTTP/1.1 closes only on `Connection: close`; HTTP/1.0 stays open only
/// on `Connection: keep-alive`; anything else closes.
pub fn should_close(req: &Request) -> bool {
    let connection = req
        .header("connection")
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match req.version.as_str() {
        "HTTP/1.1" => connection == "close",
        "HTTP/1.0" => connection != "keep-alive",
        _ => true,
    }
}
