//! `Rebar` Dispatch: dispatchers, contract cache, handler registry, and cancellation sources.

pub mod cancellation;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod resolve;
pub mod service;

pub use cancellation::{NeverCancelled, RequestScope, ShutdownCancellation};
pub use config::{DispatchConfig, DuplicatePolicy, LoggingConfig, RegistryConfig};
pub use dispatch::{
    CommandDispatcher, DispatchError, Dispatchers, HandlerTypeCache, QueryDispatcher,
};
pub use resolve::{HandlerLifetime, HandlerModule, HandlerRegistry, RegistryError, ResolverScope};
pub use service::{CommandService, QueryService};
