//! Cooperative cancellation signal handed to asynchronous handlers.
//!
//! Wraps a `tokio_util` `CancellationToken` and records the reason the
//! operation was cancelled. Reasons are stored with `ArcSwapOption` so readers
//! never block a canceller.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;

/// Error a handler returns when it stopped because its signal was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled: {}", .reason.as_deref().unwrap_or("no reason given"))]
pub struct Cancelled {
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct Reason {
    value: ArcSwapOption<String>,
    parent: Option<Arc<Reason>>,
}

impl Reason {
    fn get(&self) -> Option<String> {
        if let Some(reason) = self.value.load_full() {
            return Some(reason.as_ref().clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get())
    }
}

// ---------------------------------------------------------------------------
// CancellationSignal
// ---------------------------------------------------------------------------

/// "The operation should stop." Clones observe the same state.
///
/// Child signals are cancelled together with their parent but can also be
/// cancelled on their own without affecting the parent.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    reason: Arc<Reason>,
}

impl CancellationSignal {
    /// Creates a signal that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a child signal.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(Reason {
                value: ArcSwapOption::empty(),
                parent: Some(Arc::clone(&self.reason)),
            }),
        }
    }

    /// Cancels this signal and all of its children.
    ///
    /// The first reason recorded wins. A signal already cancelled, directly
    /// or through a parent, keeps the reason it has.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self.token.is_cancelled() {
            return;
        }
        let reason = Arc::new(reason.into());
        self.reason.value.rcu(|current| match current {
            Some(existing) => Some(Arc::clone(existing)),
            None => Some(Arc::clone(&reason)),
        });
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Reason given to the cancel call that reached this signal, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        if !self.is_cancelled() {
            return None;
        }
        self.reason.get()
    }

    /// Returns `Err(Cancelled)` once the signal is cancelled.
    ///
    /// Handlers call this between units of work and propagate the error with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] carrying the cancellation reason.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled {
                reason: self.reason(),
            })
        } else {
            Ok(())
        }
    }

    /// The underlying token, for `tokio::select!` or APIs that accept one.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl From<CancellationToken> for CancellationSignal {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
