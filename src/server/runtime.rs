use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::context::{Context, ContextError};
use crate::http::connection::Connection;
use crate::http::router::Router;
use crate::ports::Logger;
use crate::server::listener::Listener;

/// Per-connection deadline and shutdown settings for the runtime.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSettings {
    /// Read deadline armed once per connection; `None` disables.
    pub read_timeout: Option<Duration>,
    /// Write deadline armed once per connection; `None` disables.
    pub write_timeout: Option<Duration>,
    /// How long to drain in-flight connections before force-closing them.
    pub shutdown_deadline: Duration,
}

/// Owns the accept loop and the graceful shutdown lifecycle.
///
/// Every accepted connection gets its own engine task and its own
/// cancellation context, tracked in the active set. Shutdown is two-phase:
/// stop accepting, drain engines up to the deadline, then cancel whatever
/// is left and wait unconditionally.
pub struct ServerRuntime<L> {
    listener: L,
    router: Arc<Router>,
    logger: Arc<dyn Logger>,
    settings: RuntimeSettings,
    active: Arc<Mutex<HashMap<u64, Context>>>,
    next_conn_id: AtomicU64,
}

impl<L: Listener> ServerRuntime<L> {
    pub fn new(
        listener: L,
        router: Arc<Router>,
        logger: Arc<dyn Logger>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            listener,
            router,
            logger,
            settings,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_conn_id: AtomicU64::new(0),
        }
    }

    /// Number of connections currently owned by engines.
    pub fn active_connections(&self) -> usize {
        self.active.lock().len()
    }

    /// Accepts connections until `ctx` is cancelled, then drains active
    /// engines, force-closing them if the shutdown deadline fires first.
    ///
    /// Returns normally after a clean or forced shutdown; per-connection
    /// errors never surface here.
    pub async fn serve(&self, ctx: Context) {
        let mut engines = JoinSet::new();

        loop {
            tokio::select! {
                _ = ctx.done() => {
                    self.logger.info(
                        "shutdown signal received",
                        &[("action", "stop_accepts".to_string())],
                    );
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer = %peer, "accepted connection");
                        self.spawn_engine(&mut engines, stream);
                    }
                    Err(err) => {
                        self.logger.error("accept failed", &[("error", err.to_string())]);
                        continue;
                    }
                },
            }
        }

        self.logger.info("waiting for in-flight connections", &[]);
        let drained =
            tokio::time::timeout(self.settings.shutdown_deadline, drain(&mut engines)).await;

        match drained {
            Ok(()) => self.logger.info("shutdown complete", &[]),
            Err(_) => {
                self.logger.error(
                    "shutdown deadline reached",
                    &[
                        (
                            "deadline",
                            format!("{:?}", self.settings.shutdown_deadline),
                        ),
                        ("action", "force_close_active_connections".to_string()),
                    ],
                );
                for conn_ctx in self.active.lock().values() {
                    conn_ctx.cancel(ContextError::Cancelled);
                }
                drain(&mut engines).await;
                self.logger.info("shutdown complete after forced close", &[]);
            }
        }
    }

    fn spawn_engine(&self, engines: &mut JoinSet<()>, stream: L::Stream) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let conn_ctx = Context::new();
        self.active.lock().insert(conn_id, conn_ctx.clone());

        let router = self.router.clone();
        let active = self.active.clone();
        let settings = self.settings;

        engines.spawn(async move {
            let mut engine = Connection::new(
                stream,
                router,
                conn_ctx.clone(),
                settings.read_timeout,
                settings.write_timeout,
            );

            // Cancelling the connection context drops the engine future,
            // which closes the socket and unblocks any in-flight I/O.
            tokio::select! {
                _ = engine.run() => {}
                _ = conn_ctx.done() => {
                    tracing::debug!("connection force-closed");
                }
            }

            active.lock().remove(&conn_id);
        });
    }
}

/// Waits for every engine task to finish.
async fn drain(engines: &mut JoinSet<()>) {
    while engines.join_next().await.is_some() {}
}
