//! Per-request execution context.
//!
//! The surrounding platform authenticates the request and hands the core a
//! [`RequestContext`]. Cancelling it aborts any read or commit waiting on
//! the store.

use adl_types::Caller;
use tokio::sync::watch;

/// Authenticated caller plus an optional cancellation signal.
#[derive(Debug, Clone)]
pub struct RequestContext {
    caller: Caller,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`RequestContext`] derived from it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

impl RequestContext {
    /// A context that is never cancelled.
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            cancel: None,
        }
    }

    /// A context together with the handle that cancels it.
    pub fn with_cancel(caller: Caller) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                caller,
                cancel: Some(rx),
            },
            CancelHandle(tx),
        )
    }

    /// Anonymous, never-cancelled context for local tooling and tests.
    pub fn background() -> Self {
        Self::new(Caller::anonymous())
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Whether the context has already been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled. Never resolves for a
    /// context without a cancel handle, or after the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.cancel else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        let signalled = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if signalled.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
