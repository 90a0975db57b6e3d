//! Hand-written HTTP/1.1 protocol stack.
//!
//! No HTTP library underneath: wire bytes come in, structured requests go
//! through the router and middleware chain, and responses are serialized
//! back out.
//!
//! - **`parser`**: incremental, bounded request parser over a byte buffer
//! - **`request`** / **`response`**: wire types and the reason-phrase table
//! - **`router`**: `METHOD:PATH` registry plus the middleware chain
//! - **`middleware`**: logging, panic recovery, request timeout
//! - **`connection`**: per-socket engine with keep-alive and deadlines
//!
//! Data flow for one live request:
//!
//! ```text
//! socket bytes ──▶ Connection buffer ──▶ parse_http_request
//!                       ▲                     │ Request
//!                       │ need more           ▼
//!                       └──────────── Router::resolve ──▶ middleware chain
//!                                                              │
//! socket bytes ◀── Response::serialize ◀───────────────────────┘
//! ```
//!
//! The parser distinguishes *incomplete* input (the engine reads more)
//! from *malformed* input (the engine answers `400` and closes).

pub mod connection;
pub mod middleware;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;

pub use connection::Connection;
pub use parser::{parse_http_request, ParseError};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use router::{handler_fn, HandlerFn, Middleware, Router};
