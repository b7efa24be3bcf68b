use std::sync::Arc;

use dashmap::DashMap;
use rebar_core::{ContractKey, HandlerContract, HandlerInstance, Resolver};

use super::registry::{HandlerLifetime, HandlerRegistry};

/// Resolution scope for one logical operation (typically one request).
///
/// `Scoped` handlers are built at most once per scope. `Singleton` and
/// `Transient` handlers resolve exactly as they do on the registry.
/// Dropping the scope drops its scoped instances.
pub struct ResolverScope {
    registry: Arc<HandlerRegistry>,
    scoped: DashMap<ContractKey, HandlerInstance>,
}

impl ResolverScope {
    pub(crate) fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            scoped: DashMap::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Number of scoped instances built so far.
    #[must_use]
    pub fn scoped_len(&self) -> usize {
        self.scoped.len()
    }
}

impl Resolver for ResolverScope {
    fn try_resolve(&self, contract: &HandlerContract) -> Option<HandlerInstance> {
        let key = contract.key();
        let registration = self.registry.registration(&key)?;

        if registration.lifetime() == HandlerLifetime::Scoped {
            if let Some(existing) = self.scoped.get(&key) {
                return Some(existing.value().clone());
            }
            // Built without holding a shard lock; the first insert wins a race.
            let built = registration.build();
            let instance = self.scoped.entry(key).or_insert(built).value().clone();
            return Some(instance);
        }

        self.registry.try_resolve(contract)
    }
}
