use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rebar_core::{
    AsyncCommandHandler, AsyncQueryHandler, Command, CommandHandler, ContractKey, HandlerContract,
    HandlerInstance, HandlerMode, Query, QueryHandler, QueryResponse, Resolver,
};
use tracing::{debug, warn};

use super::scope::ResolverScope;
use crate::config::{DuplicatePolicy, RegistryConfig};

// ---------------------------------------------------------------------------
// HandlerLifetime
// ---------------------------------------------------------------------------

/// How long a resolved handler instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerLifetime {
    /// Built once, on first resolution, and shared for the registry's lifetime.
    Singleton,
    /// Built once per `ResolverScope`. Resolving from the registry itself
    /// treats the registry as the root scope, so the instance is shared there.
    Scoped,
    /// Built on every resolution.
    Transient,
}

/// Errors raised while registering handlers.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler is already registered for {contract}")]
    DuplicateHandler { contract: String },
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

type Factory = Arc<dyn Fn() -> HandlerInstance + Send + Sync>;

/// A contract bound to a handler factory.
pub(crate) struct Registration {
    contract: HandlerContract,
    lifetime: HandlerLifetime,
    factory: Factory,
    shared: OnceLock<HandlerInstance>,
}

impl Registration {
    pub(crate) fn lifetime(&self) -> HandlerLifetime {
        self.lifetime
    }

    /// A fresh instance, regardless of lifetime.
    pub(crate) fn build(&self) -> HandlerInstance {
        (self.factory)()
    }

    /// Resolution semantics of the root registry.
    fn resolve(&self) -> HandlerInstance {
        match self.lifetime {
            HandlerLifetime::Singleton | HandlerLifetime::Scoped => {
                self.shared.get_or_init(|| self.build()).clone()
            }
            HandlerLifetime::Transient => self.build(),
        }
    }
}

// ---------------------------------------------------------------------------
// HandlerModule
// ---------------------------------------------------------------------------

/// A group of handlers that registers itself in one call.
///
/// Lets each feature area of an application own its handler wiring:
///
/// ```ignore
/// struct OrdersModule { db: Arc<Db> }
///
/// impl HandlerModule for OrdersModule {
///     fn register(&self, registry: &HandlerRegistry) -> Result<(), RegistryError> {
///         let db = Arc::clone(&self.db);
///         registry.register_command::<PlaceOrder, _, _>(HandlerLifetime::Scoped, move || {
///             PlaceOrderHandler::new(Arc::clone(&db))
///         })
///     }
/// }
/// ```
pub trait HandlerModule {
    /// # Errors
    ///
    /// Returns the first registration error encountered.
    fn register(&self, registry: &HandlerRegistry) -> Result<(), RegistryError>;
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// Registry of handler factories keyed by handler contract.
///
/// Built at startup, then shared (`Arc`) and used as the dispatchers'
/// `Resolver`. Registration order is kept for diagnostics.
pub struct HandlerRegistry {
    registrations: DashMap<ContractKey, Arc<Registration>>,
    order: RwLock<Vec<ContractKey>>,
    config: RegistryConfig,
}

impl HandlerRegistry {
    /// Creates an empty registry that rejects duplicate registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            registrations: DashMap::new(),
            order: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Registers a synchronous handler for command `C`.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateHandler` if a sync handler for `C` exists and
    /// duplicates are rejected.
    pub fn register_command<C, H, F>(
        &self,
        lifetime: HandlerLifetime,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        C: Command,
        H: CommandHandler<C>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert(
            HandlerContract::command::<C>(HandlerMode::Sync),
            lifetime,
            Arc::new(move || HandlerInstance::command::<C, H>(factory())),
        )
    }

    /// Registers an asynchronous handler for command `C`.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateHandler` if an async handler for `C` exists
    /// and duplicates are rejected.
    pub fn register_async_command<C, H, F>(
        &self,
        lifetime: HandlerLifetime,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        C: Command,
        H: AsyncCommandHandler<C>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert(
            HandlerContract::command::<C>(HandlerMode::Async),
            lifetime,
            Arc::new(move || HandlerInstance::async_command::<C, H>(factory())),
        )
    }

    /// Registers a synchronous handler answering `Q` with `R`.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateHandler` if a sync handler for (`Q`, `R`)
    /// exists and duplicates are rejected.
    pub fn register_query<Q, R, H, F>(
        &self,
        lifetime: HandlerLifetime,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        Q: Query<R>,
        R: QueryResponse,
        H: QueryHandler<Q, R>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert(
            HandlerContract::query::<Q, R>(HandlerMode::Sync),
            lifetime,
            Arc::new(move || HandlerInstance::query::<Q, R, H>(factory())),
        )
    }

    /// Registers an asynchronous handler answering `Q` with `R`.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateHandler` if an async handler for (`Q`, `R`)
    /// exists and duplicates are rejected.
    pub fn register_async_query<Q, R, H, F>(
        &self,
        lifetime: HandlerLifetime,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        Q: Query<R>,
        R: QueryResponse,
        H: AsyncQueryHandler<Q, R>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert(
            HandlerContract::query::<Q, R>(HandlerMode::Async),
            lifetime,
            Arc::new(move || HandlerInstance::async_query::<Q, R, H>(factory())),
        )
    }

    /// Registers an already-built sync command handler as a singleton.
    ///
    /// # Errors
    ///
    /// See [`register_command`](Self::register_command).
    pub fn register_command_instance<C, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let handler = Arc::new(handler);
        self.register_command::<C, _, _>(HandlerLifetime::Singleton, move || Arc::clone(&handler))
    }

    /// Registers an already-built async command handler as a singleton.
    ///
    /// # Errors
    ///
    /// See [`register_async_command`](Self::register_async_command).
    pub fn register_async_command_instance<C, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        C: Command,
        H: AsyncCommandHandler<C>,
    {
        let handler = Arc::new(handler);
        self.register_async_command::<C, _, _>(HandlerLifetime::Singleton, move || {
            Arc::clone(&handler)
        })
    }

    /// Registers an already-built sync query handler as a singleton.
    ///
    /// # Errors
    ///
    /// See [`register_query`](Self::register_query).
    pub fn register_query_instance<Q, R, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        Q: Query<R>,
        R: QueryResponse,
        H: QueryHandler<Q, R>,
    {
        let handler = Arc::new(handler);
        self.register_query::<Q, R, _, _>(HandlerLifetime::Singleton, move || Arc::clone(&handler))
    }

    /// Registers an already-built async query handler as a singleton.
    ///
    /// # Errors
    ///
    /// See [`register_async_query`](Self::register_async_query).
    pub fn register_async_query_instance<Q, R, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        Q: Query<R>,
        R: QueryResponse,
        H: AsyncQueryHandler<Q, R>,
    {
        let handler = Arc::new(handler);
        self.register_async_query::<Q, R, _, _>(HandlerLifetime::Singleton, move || {
            Arc::clone(&handler)
        })
    }

    /// Lets `module` register its handlers.
    ///
    /// # Errors
    ///
    /// Propagates the module's first registration error.
    pub fn install<M: HandlerModule + ?Sized>(&self, module: &M) -> Result<(), RegistryError> {
        let before = self.len();
        module.register(self)?;
        debug!(
            module = std::any::type_name::<M>(),
            added = self.len().saturating_sub(before),
            "installed handler module"
        );
        Ok(())
    }

    /// Opens a resolution scope for one logical operation.
    #[must_use]
    pub fn scope(self: &Arc<Self>) -> ResolverScope {
        ResolverScope::new(Arc::clone(self))
    }

    /// Registered contract names, in registration order.
    #[must_use]
    pub fn contracts(&self) -> Vec<String> {
        let keys = self.order.read().clone();
        keys.iter()
            .filter_map(|key| {
                self.registrations
                    .get(key)
                    .map(|entry| entry.value().contract.name().to_string())
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn registration(&self, key: &ContractKey) -> Option<Arc<Registration>> {
        self.registrations
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn insert(
        &self,
        contract: HandlerContract,
        lifetime: HandlerLifetime,
        factory: Factory,
    ) -> Result<(), RegistryError> {
        let key = contract.key();
        let registration = Arc::new(Registration {
            contract,
            lifetime,
            factory,
            shared: OnceLock::new(),
        });

        // The shard guard must be released before `order` is locked.
        let added = match self.registrations.entry(key) {
            Entry::Occupied(mut occupied) => match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(RegistryError::DuplicateHandler {
                        contract: registration.contract.name().to_string(),
                    })
                }
                DuplicatePolicy::Replace => {
                    warn!(
                        contract = %registration.contract,
                        "replacing previously registered handler"
                    );
                    occupied.insert(registration);
                    false
                }
            },
            Entry::Vacant(vacant) => {
                debug!(
                    contract = %registration.contract,
                    lifetime = ?lifetime,
                    "registered handler"
                );
                vacant.insert(registration);
                true
            }
        };

        if added {
            self.order.write().push(key);
        }
        Ok(())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for HandlerRegistry {
    fn try_resolve(&self, contract: &HandlerContract) -> Option<HandlerInstance> {
        self.registration(&contract.key())
            .map(|registration| registration.resolve())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
