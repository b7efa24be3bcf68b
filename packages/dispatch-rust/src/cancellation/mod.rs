//! `CancellationSource` implementations.
//!
//! - [`NeverCancelled`]: for callers with no notion of cancellation
//! - [`RequestScope`]: one per inbound request, cancelled on abort or drop
//! - [`ShutdownCancellation`]: process-level root that request scopes derive from

pub mod scope;
pub mod shutdown;

pub use scope::RequestScope;
pub use shutdown::ShutdownCancellation;

use rebar_core::{CancellationSignal, CancellationSource};

/// Hands out signals that are never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancellationSource for NeverCancelled {
    fn current(&self) -> CancellationSignal {
        CancellationSignal::new()
    }
}
