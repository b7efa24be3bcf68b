use std::sync::Arc;

use rebar_core::{CancellationSource, Resolver};

use super::cache::HandlerTypeCache;
use super::command::CommandDispatcher;
use super::query::QueryDispatcher;
use crate::cancellation::RequestScope;
use crate::resolve::HandlerRegistry;

/// A command dispatcher and a query dispatcher sharing one resolver, one
/// cancellation source and one `HandlerTypeCache`.
#[derive(Clone)]
pub struct Dispatchers {
    commands: CommandDispatcher,
    queries: QueryDispatcher,
}

impl Dispatchers {
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>, cancellation: Arc<dyn CancellationSource>) -> Self {
        Self {
            commands: CommandDispatcher::new(Arc::clone(&resolver), Arc::clone(&cancellation)),
            queries: QueryDispatcher::new(resolver, cancellation),
        }
    }

    /// Dispatchers for one request: scoped handlers are resolved from a fresh
    /// `ResolverScope` and async handlers observe `scope`'s signal.
    #[must_use]
    pub fn for_scope(registry: &Arc<HandlerRegistry>, scope: Arc<RequestScope>) -> Self {
        Self::new(Arc::new(registry.scope()), scope)
    }

    /// Uses `cache` for both dispatchers.
    #[must_use]
    pub fn with_cache(self, cache: Arc<HandlerTypeCache>) -> Self {
        Self {
            commands: self.commands.with_cache(Arc::clone(&cache)),
            queries: self.queries.with_cache(cache),
        }
    }

    #[must_use]
    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    #[must_use]
    pub fn queries(&self) -> &QueryDispatcher {
        &self.queries
    }
}
