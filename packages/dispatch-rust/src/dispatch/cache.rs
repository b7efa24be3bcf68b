//! Memoized request-type → handler-contract lookup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use rebar_core::{ContractKey, HandlerContract, HandlerKind, HandlerMode, TypeInfo};
use tracing::debug;

static GLOBAL: OnceLock<Arc<HandlerTypeCache>> = OnceLock::new();

/// Caches the handler contract synthesized for each (request type, response
/// type, kind, mode) key.
///
/// Entries are written once and never evicted. The map is sharded (`DashMap`)
/// and the insert runs under the shard's entry lock, so concurrent first
/// lookups of one key synthesize exactly once and all observe the same
/// `Arc<HandlerContract>`.
#[derive(Debug, Default)]
pub struct HandlerTypeCache {
    contracts: DashMap<ContractKey, Arc<HandlerContract>>,
    synthesized: AtomicU64,
}

impl HandlerTypeCache {
    /// Creates an empty, private cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by dispatchers unless told otherwise.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the cached contract for the key, synthesizing it on first use.
    ///
    /// `response` must be `Some` for queries and `None` for commands.
    pub fn get_or_compute(
        &self,
        kind: HandlerKind,
        mode: HandlerMode,
        request: TypeInfo,
        response: Option<TypeInfo>,
    ) -> Arc<HandlerContract> {
        let key = ContractKey {
            kind,
            mode,
            request: request.id(),
            response: response.map(|r| r.id()),
        };

        if let Some(contract) = self.contracts.get(&key) {
            return Arc::clone(contract.value());
        }

        let entry = self.contracts.entry(key).or_insert_with(|| {
            self.synthesized.fetch_add(1, Ordering::Relaxed);
            let contract = HandlerContract::synthesize(kind, mode, request, response);
            debug!(contract = %contract, "synthesized handler contract");
            Arc::new(contract)
        });
        Arc::clone(entry.value())
    }

    /// Number of contracts synthesized since the cache was created.
    #[must_use]
    pub fn synthesis_count(&self) -> u64 {
        self.synthesized.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn contains(&self, key: &ContractKey) -> bool {
        self.contracts.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
