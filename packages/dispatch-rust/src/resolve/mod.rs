//! Handler registration and resolution.
//!
//! `HandlerRegistry` is the `Resolver` shipped with the dispatchers. Handlers
//! are registered as factories with a `HandlerLifetime`. `ResolverScope`
//! narrows `Scoped` handlers to one logical operation.

pub mod registry;
pub mod scope;

pub use registry::{HandlerLifetime, HandlerModule, HandlerRegistry, RegistryError};
pub use scope::ResolverScope;
