use rebar_core::{CancellationSignal, CancellationSource};
use tracing::debug;
use uuid::Uuid;

/// Reason recorded when a scope is dropped without being aborted first.
pub const SCOPE_ENDED: &str = "request scope ended";

/// Cancellation source for one inbound request.
///
/// Every dispatch made through this scope sees the same signal. The signal is
/// cancelled by [`abort`](Self::abort), by the parent signal (when the scope
/// was derived from one), or when the scope is dropped.
#[derive(Debug)]
pub struct RequestScope {
    id: Uuid,
    signal: CancellationSignal,
}

impl RequestScope {
    /// Creates a root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::from_signal(CancellationSignal::new())
    }

    /// Creates a scope that is also cancelled when `parent` is.
    #[must_use]
    pub fn with_parent(parent: &CancellationSignal) -> Self {
        Self::from_signal(parent.child())
    }

    fn from_signal(signal: CancellationSignal) -> Self {
        let id = Uuid::new_v4();
        debug!(scope_id = %id, "request scope opened");
        Self { id, signal }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancels every signal handed out by this scope.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(scope_id = %self.id, reason = %reason, "request scope aborted");
        self.signal.cancel(reason);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.signal.is_cancelled()
    }

    #[must_use]
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSource for RequestScope {
    fn current(&self) -> CancellationSignal {
        self.signal.clone()
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if !self.signal.is_cancelled() {
            self.signal.cancel(SCOPE_ENDED);
        }
    }
}
