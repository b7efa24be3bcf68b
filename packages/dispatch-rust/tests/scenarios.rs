//! End-to-end dispatch scenarios through the public API.

use std::sync::Arc;

use parking_lot::Mutex;
use rebar_core::{
    Command, CommandHandler, HandlerContract, HandlerInstance, HandlerMode, Query, QueryHandler,
    QueryResponse, Resolver,
};
use rebar_dispatch::{
    DispatchError, Dispatchers, HandlerLifetime, HandlerModule, HandlerRegistry, HandlerTypeCache,
    NeverCancelled, RegistryError,
};

struct Greet {
    name: String,
}
impl Command for Greet {}

#[derive(Debug, PartialEq, Eq)]
struct IntResponse {
    value: i64,
}
impl QueryResponse for IntResponse {}

struct GetCount;
impl Query<IntResponse> for GetCount {}

#[derive(Default)]
struct GreetingLog {
    names: Mutex<Vec<String>>,
}

impl CommandHandler<Greet> for GreetingLog {
    fn execute(&self, command: &Greet) -> anyhow::Result<()> {
        self.names.lock().push(command.name.clone());
        Ok(())
    }
}

struct FixedCount;

impl QueryHandler<GetCount, IntResponse> for FixedCount {
    fn execute(&self, _query: &GetCount) -> anyhow::Result<IntResponse> {
        Ok(IntResponse { value: 42 })
    }
}

struct GreetingModule {
    log: Arc<GreetingLog>,
}

impl HandlerModule for GreetingModule {
    fn register(&self, registry: &HandlerRegistry) -> Result<(), RegistryError> {
        let log = Arc::clone(&self.log);
        registry.register_command::<Greet, _, _>(HandlerLifetime::Singleton, move || {
            Arc::clone(&log)
        })?;
        registry.register_query::<GetCount, IntResponse, _, _>(HandlerLifetime::Transient, || {
            FixedCount
        })
    }
}

fn dispatchers(log: &Arc<GreetingLog>) -> Dispatchers {
    let registry = HandlerRegistry::new();
    registry
        .install(&GreetingModule {
            log: Arc::clone(log),
        })
        .unwrap();
    Dispatchers::new(Arc::new(registry), Arc::new(NeverCancelled))
        .with_cache(Arc::new(HandlerTypeCache::new()))
}

#[test]
fn greet_alice_reaches_handler_once() {
    let log = Arc::new(GreetingLog::default());
    let dispatchers = dispatchers(&log);

    dispatchers
        .commands()
        .send(&Greet {
            name: "Alice".to_string(),
        })
        .unwrap();

    assert_eq!(*log.names.lock(), vec!["Alice".to_string()]);
}

#[test]
fn get_count_returns_handler_value() {
    let dispatchers = dispatchers(&Arc::new(GreetingLog::default()));

    let response: IntResponse = dispatchers.queries().ask(&GetCount).unwrap();

    assert_eq!(response, IntResponse { value: 42 });
}

#[test]
fn repeated_dispatch_reuses_cached_contract() {
    let log = Arc::new(GreetingLog::default());
    let dispatchers = dispatchers(&log);

    for name in ["Ann", "Ben", "Cy"] {
        dispatchers
            .commands()
            .send(&Greet {
                name: name.to_string(),
            })
            .unwrap();
    }

    assert_eq!(log.names.lock().len(), 3);
    assert_eq!(dispatchers.commands().cache().synthesis_count(), 1);
}

#[test]
fn absent_query_is_invalid() {
    let dispatchers = dispatchers(&Arc::new(GreetingLog::default()));
    let err = dispatchers
        .queries()
        .execute::<IntResponse>(None)
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidRequest { .. }));
    assert_eq!(err.to_string(), "no query was provided to dispatch");
}

/// Answers every contract with the Greet handler, whatever was asked for.
struct MisconfiguredResolver;

impl Resolver for MisconfiguredResolver {
    fn try_resolve(&self, _contract: &HandlerContract) -> Option<HandlerInstance> {
        Some(HandlerInstance::command::<Greet, _>(GreetingLog::default()))
    }
}

#[test]
fn handler_for_another_contract_is_not_found() {
    let dispatchers = Dispatchers::new(Arc::new(MisconfiguredResolver), Arc::new(NeverCancelled))
        .with_cache(Arc::new(HandlerTypeCache::new()));

    let err = dispatchers.queries().ask(&GetCount).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::HandlerNotFound { ref contract, .. } if contract.starts_with("QueryHandler<")
    ));
}

#[tokio::test]
async fn sync_registration_does_not_serve_async_dispatch() {
    let dispatchers = dispatchers(&Arc::new(GreetingLog::default()));

    let err = dispatchers
        .queries()
        .ask_async::<GetCount, IntResponse>(&GetCount)
        .await
        .unwrap_err();

    let expected = HandlerContract::query::<GetCount, IntResponse>(HandlerMode::Async);
    assert!(matches!(
        err,
        DispatchError::HandlerNotFound { ref contract, .. } if *contract == expected.name()
    ));
}
