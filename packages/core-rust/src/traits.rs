//! Ports consumed by the dispatchers.
//!
//! Both are implemented outside the dispatch core: a `Resolver` by whatever
//! container owns handler instances, a `CancellationSource` by whatever owns
//! the lifecycle of the current logical operation (e.g. an inbound request).

use crate::cancellation::CancellationSignal;
use crate::contract::HandlerContract;
use crate::instance::HandlerInstance;

/// Turns a handler contract into a handler instance.
///
/// Called once per dispatch. Implementations decide instance lifetime
/// (shared, per scope, per call) and what happens when several handlers were
/// registered for the same contract.
pub trait Resolver: Send + Sync {
    /// Returns `None` when no handler is registered for `contract`.
    fn try_resolve(&self, contract: &HandlerContract) -> Option<HandlerInstance>;
}

/// Supplies the cancellation signal of the current logical operation.
/// Consulted only on asynchronous dispatch paths.
pub trait CancellationSource: Send + Sync {
    fn current(&self) -> CancellationSignal;
}
