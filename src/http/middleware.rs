//! Built-in middleware: request logging, panic recovery, request timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::context::{Context, ContextError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::router::{HandlerFn, Middleware};
use crate::ports::{Clock, Logger};

/// Logs one info line per request: method, path, status, duration, and the
/// request/correlation IDs taken from the `x-request-id` and
/// `x-correlation-id` headers.
pub fn logging_middleware(logger: Arc<dyn Logger>, clock: Arc<dyn Clock>) -> Middleware {
    Arc::new(move |next: HandlerFn| {
        let logger = logger.clone();
        let clock = clock.clone();
        Arc::new(move |req: Request| {
            let logger = logger.clone();
            let clock = clock.clone();
            let next = next.clone();
            Box::pin(async move {
                let method = req.method.clone();
                let path = req.path.clone();
                let (request_id, correlation_id) = request_identifiers(&req);

                let started_at = clock.now();
                let resp = next(req).await;
                let duration = clock.now().duration_since(started_at);

                let status = if resp.status_code == 0 {
                    200
                } else {
                    resp.status_code
                };

                logger.info(
                    "http request",
                    &[
                        ("method", method),
                        ("path", path),
                        ("status", status.to_string()),
                        ("duration", format!("{:?}", duration)),
                        ("request_id", request_id),
                        ("correlation_id", correlation_id),
                    ],
                );
                resp
            })
        })
    })
}

/// Converts a panicking handler into a 500 response.
///
/// The downstream handler runs on its own task; a panic surfaces as a
/// join error instead of unwinding through the connection engine. This is
/// the only place a programming fault becomes a valid response.
pub fn recovery_middleware(logger: Arc<dyn Logger>) -> Middleware {
    Arc::new(move |next: HandlerFn| {
        let logger = logger.clone();
        Arc::new(move |req: Request| {
            let logger = logger.clone();
            let next = next.clone();
            Box::pin(async move {
                let method = req.method.clone();
                let path = req.path.clone();
                let (request_id, correlation_id) = request_identifiers(&req);

                match tokio::spawn(next(req)).await {
                    Ok(resp) => resp,
                    Err(join_err) => {
                        logger.error(
                            "panic recovered",
                            &[
                                ("method", method),
                                ("path", path),
                                ("panic", fault_description(join_err)),
                                ("request_id", request_id),
                                ("correlation_id", correlation_id),
                            ],
                        );
                        Response::internal_error()
                    }
                }
            })
        })
    })
}

/// Races the downstream handler against a per-request deadline.
///
/// A zero duration disables the middleware entirely. Otherwise the request
/// is shallow-cloned with a deadline-bearing child context and the handler
/// runs on its own task. When the deadline fires first the client gets a
/// 408 and the task keeps running to completion with its result discarded;
/// the handler observes cancellation through its context.
pub fn timeout_middleware(timeout: Duration) -> Middleware {
    Arc::new(move |next: HandlerFn| {
        if timeout.is_zero() {
            return next;
        }
        Arc::new(move |req: Request| {
            let next = next.clone();
            Box::pin(async move {
                let deadline = Instant::now() + timeout;
                let child = Context::with_deadline(&req.ctx, deadline);

                let mut guarded = req.clone();
                guarded.ctx = child.clone();

                let handle = tokio::spawn(next(guarded));

                let resp = tokio::select! {
                    joined = handle => match joined {
                        Ok(resp) => resp,
                        Err(_) => Response::internal_error(),
                    },
                    cause = child.done() => match cause {
                        ContextError::DeadlineExceeded => Response::request_timeout(),
                        _ => Response::internal_error(),
                    },
                };

                // Reap the deadline watchdog when the handler beat it.
                child.cancel(ContextError::Cancelled);
                resp
            })
        })
    })
}

/// Extracts request/correlation IDs from headers, empty when absent.
fn request_identifiers(req: &Request) -> (String, String) {
    let request_id = req.header("x-request-id").unwrap_or("").trim().to_string();
    let correlation_id = req
        .header("x-correlation-id")
        .unwrap_or("")
        .trim()
        .to_string();
    (request_id, correlation_id)
}

/// Renders a join error into a loggable fault description.
fn fault_description(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "handler task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
