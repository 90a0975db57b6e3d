//! Vigil - TLS-terminating HTTP/1.1 server
//!
//! A self-contained HTTP/1.1 stack built without an HTTP library: an
//! incremental bounded parser, a `METHOD:PATH` router with a composable
//! middleware chain, a per-connection engine with keep-alive and
//! deadlines, and a runtime with two-phase graceful shutdown behind a
//! rustls TLS front.

pub mod config;
pub mod context;
pub mod http;
pub mod logging;
pub mod ports;
pub mod server;
pub mod service;
