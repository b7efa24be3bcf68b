//! Command and query dispatch.
//!
//! Every dispatch call walks the same steps:
//!
//! 1. **Validate**: an absent request fails with `DispatchError::InvalidRequest`
//! 2. **Resolve type**: `HandlerTypeCache` maps the request's runtime type to its contract
//! 3. **Resolve instance**: the `Resolver` port turns the contract into a handler
//! 4. **Invoke**: the handler runs (async paths also receive a `CancellationSignal`)
//! 5. **Return**: the handler's result or error goes back to the caller unchanged

pub mod bundle;
pub mod cache;
pub mod command;
pub mod error;
pub mod query;

pub use bundle::Dispatchers;
pub use cache::HandlerTypeCache;
pub use command::CommandDispatcher;
pub use error::DispatchError;
pub use query::QueryDispatcher;

use rebar_core::{HandlerContract, HandlerInstance, Resolver};
use tracing::{debug, warn};

/// Single resolution attempt for `contract`.
///
/// An instance registered under a different contract is treated like a
/// missing one: the dispatcher cannot invoke it.
fn resolve_instance(
    resolver: &dyn Resolver,
    contract: &HandlerContract,
) -> Result<HandlerInstance, DispatchError> {
    match resolver.try_resolve(contract) {
        Some(instance) if instance.key() == contract.key() => {
            debug!(handler = instance.handler_type(), "resolved handler");
            Ok(instance)
        }
        Some(instance) => {
            warn!(
                contract = %contract,
                handler = instance.handler_type(),
                "resolver returned a handler for a different contract"
            );
            Err(DispatchError::not_found(contract))
        }
        None => {
            warn!(contract = %contract, "no handler registered");
            Err(DispatchError::not_found(contract))
        }
    }
}
