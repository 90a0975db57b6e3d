//! Server runtime: listener abstraction, TLS front, accept loop, and
//! graceful shutdown.

pub mod listener;
pub mod runtime;
pub mod tls;

pub use listener::Listener;
pub use runtime::{RuntimeSettings, ServerRuntime};
pub use tls::{TlsListener, TlsSettings, TlsVersion};
