//! Cancellation and deadline propagation.
//!
//! A [`Context`] is a cloneable cancellation scope. The server runtime owns
//! the root context, each connection engine owns one, and the timeout
//! middleware derives a deadline-bearing child for every request it guards.
//! Cancellation is advisory: observers poll [`Context::err`] or await
//! [`Context::done`]; nothing is forcibly stopped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

/// Terminal state of a cancelled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context was cancelled explicitly (shutdown, parent cancellation).
    Cancelled,
    /// The context's deadline elapsed.
    DeadlineExceeded,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::Cancelled => write!(f, "context cancelled"),
            ContextError::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

struct ContextInner {
    state: watch::Sender<Option<ContextError>>,
    deadline: Option<Instant>,
}

/// A cancellation scope handed from the runtime to engines to handlers.
///
/// Clones share the same scope. Cancelling any clone cancels them all;
/// the first cause wins and later calls are no-ops.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Creates a root context with no deadline.
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(ContextInner {
                state,
                deadline: None,
            }),
        }
    }

    /// Derives a child that is cancelled when the parent is cancelled or
    /// when `deadline` passes, whichever happens first.
    ///
    /// The watchdog task exits once the child reaches a terminal state, so
    /// callers that finish early should [`cancel`](Context::cancel) the
    /// child to reap it before the deadline.
    pub fn with_deadline(parent: &Context, deadline: Instant) -> Self {
        let (state, _) = watch::channel(None);
        let child = Self {
            inner: Arc::new(ContextInner {
                state,
                deadline: Some(deadline),
            }),
        };

        let parent = parent.clone();
        let watched = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                cause = parent.done() => watched.cancel(cause),
                _ = tokio::time::sleep_until(deadline) => {
                    watched.cancel(ContextError::DeadlineExceeded);
                }
                _ = watched.done() => {}
            }
        });

        child
    }

    /// Cancels the context with the given cause. The first cause sticks.
    pub fn cancel(&self, cause: ContextError) {
        self.inner.state.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(cause);
                true
            } else {
                false
            }
        });
    }

    /// Returns the terminal state, or `None` while the context is live.
    pub fn err(&self) -> Option<ContextError> {
        *self.inner.state.borrow()
    }

    /// Reports whether the context has reached a terminal state.
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Returns the deadline this context was derived with, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolves once the context is cancelled, yielding the cause.
    pub async fn done(&self) -> ContextError {
        let mut rx = self.inner.state.subscribe();
        loop {
            if let Some(cause) = *rx.borrow_and_update() {
                return cause;
            }
            // The sender lives in self.inner, so changed() cannot fail
            // while this future is polled.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}
