//! Transport-agnostic service port and its HTTP adapter.
//!
//! Business logic implements [`Service`] without knowing about HTTP;
//! [`service_handler`] turns any service into a routed handler and maps
//! service errors to status codes.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::context::Context;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::router::HandlerFn;

/// Input to a service call, detached from the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Output of a successful service call.
#[derive(Debug, Clone)]
pub struct ServiceOutput {
    pub body: Vec<u8>,
}

/// Errors a service may return; the adapter maps each to a status code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("bad request")]
    BadRequest,
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A request/response service. Implementations must be safe to invoke
/// concurrently.
pub trait Service: Send + Sync {
    fn handle(&self, ctx: &Context, input: ServiceInput) -> Result<ServiceOutput, ServiceError>;
}

/// Adapts a service into a routed handler.
///
/// Headers and body are copied across the boundary so the service never
/// aliases HTTP-layer state.
pub fn service_handler(service: Arc<dyn Service>) -> HandlerFn {
    Arc::new(move |req: Request| {
        let service = service.clone();
        Box::pin(async move {
            let input = ServiceInput {
                path: req.path.clone(),
                headers: req.headers.clone(),
                body: req.body.clone(),
            };

            match service.handle(&req.ctx, input) {
                Ok(output) => {
                    let mut resp = Response::new();
                    resp.set_header("Content-Type", "text/plain");
                    resp.write_bytes(&output.body);
                    resp
                }
                Err(err) => error_response(&err),
            }
        })
    })
}

/// Maps service errors to canonical plain-text responses.
fn error_response(err: &ServiceError) -> Response {
    match err {
        ServiceError::BadRequest => Response::text(400, "Bad Request"),
        ServiceError::Unauthorized => Response::text(401, "Unauthorized"),
        ServiceError::NotFound => Response::text(404, "Not Found"),
        ServiceError::Internal(_) => Response::text(500, "Internal Server Error"),
    }
}
