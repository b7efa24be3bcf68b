//! Process-level cancellation root.

use rebar_core::{CancellationSignal, CancellationSource};
use tracing::info;

use super::scope::RequestScope;

/// Root signal for the whole process.
///
/// Request scopes opened through [`request_scope`](Self::request_scope) and
/// signals handed out by [`current`](Self::current) are children of the
/// root, so [`trigger`](Self::trigger) reaches every in-flight async handler.
#[derive(Debug, Default)]
pub struct ShutdownCancellation {
    signal: CancellationSignal,
}

impl ShutdownCancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the root and everything derived from it.
    pub fn trigger(&self, reason: impl Into<String>) {
        let reason = reason.into();
        info!(reason = %reason, "shutdown triggered");
        self.signal.cancel(reason);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) {
        self.signal.cancelled().await;
    }

    /// Opens a request scope that ends early if shutdown is triggered.
    #[must_use]
    pub fn request_scope(&self) -> RequestScope {
        RequestScope::with_parent(&self.signal)
    }

    #[must_use]
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }
}

impl CancellationSource for ShutdownCancellation {
    fn current(&self) -> CancellationSignal {
        self.signal.child()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn trigger_reaches_scopes_and_current_signals() {
        let shutdown = ShutdownCancellation::new();
        let scope = shutdown.request_scope();
        let signal = shutdown.current();

        shutdown.trigger("SIGTERM");

        assert!(shutdown.is_triggered());
        assert!(scope.is_aborted());
        assert_eq!(signal.reason().as_deref(), Some("SIGTERM"));
    }

    #[test]
    fn cancelling_a_child_does_not_trigger_shutdown() {
        let shutdown = ShutdownCancellation::new();
        shutdown.current().cancel("one request");
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn triggered_resolves_after_trigger() {
        let shutdown = std::sync::Arc::new(ShutdownCancellation::new());
        let waiter = {
            let shutdown = std::sync::Arc::clone(&shutdown);
            tokio::spawn(async move { shutdown.triggered().await })
        };

        shutdown.trigger("test");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
