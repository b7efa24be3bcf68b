use std::sync::Arc;

use rebar_core::{CancellationSource, Command, HandlerKind, HandlerMode, Resolver};
use tracing::{debug_span, Instrument};

use super::cache::HandlerTypeCache;
use super::error::DispatchError;
use super::resolve_instance;

/// Executes commands against the single handler registered for their type.
///
/// Stateless apart from the shared `HandlerTypeCache`; clone it freely and
/// share it across tasks.
#[derive(Clone)]
pub struct CommandDispatcher {
    resolver: Arc<dyn Resolver>,
    cancellation: Arc<dyn CancellationSource>,
    cache: Arc<HandlerTypeCache>,
}

impl CommandDispatcher {
    /// Creates a dispatcher backed by the process-wide `HandlerTypeCache`.
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>, cancellation: Arc<dyn CancellationSource>) -> Self {
        Self {
            resolver,
            cancellation,
            cache: HandlerTypeCache::global(),
        }
    }

    /// Uses `cache` instead of the process-wide cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<HandlerTypeCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Same dispatcher, resolving through `resolver` (e.g. a per-request scope).
    #[must_use]
    pub fn with_resolver(&self, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            ..self.clone()
        }
    }

    /// Same dispatcher, taking signals from `cancellation`.
    #[must_use]
    pub fn with_cancellation(&self, cancellation: Arc<dyn CancellationSource>) -> Self {
        Self {
            cancellation,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<HandlerTypeCache> {
        &self.cache
    }

    /// Runs the command through its synchronous `CommandHandler`.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidRequest` if `command` is `None`
    /// - `DispatchError::HandlerNotFound` if no sync handler is registered for its type
    /// - `DispatchError::Handler` with the handler's own error
    pub fn execute(&self, command: Option<&dyn Command>) -> Result<(), DispatchError> {
        let command = command.ok_or(DispatchError::InvalidRequest {
            kind: HandlerKind::Command,
        })?;
        let contract = self.cache.get_or_compute(
            HandlerKind::Command,
            HandlerMode::Sync,
            command.request_type(),
            None,
        );

        let _span = debug_span!(
            "dispatch",
            kind = "command",
            mode = "sync",
            request = contract.request().name(),
        )
        .entered();

        let handler = resolve_instance(self.resolver.as_ref(), &contract)?
            .command_handler()
            .ok_or_else(|| DispatchError::not_found(&contract))?;

        handler.execute(command).map_err(DispatchError::Handler)
    }

    /// Runs the command through its `AsyncCommandHandler`, passing the current
    /// cancellation signal.
    ///
    /// Completes when the handler completes, fails, or gives up on
    /// cancellation. No timeout is applied here.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidRequest` if `command` is `None`
    /// - `DispatchError::HandlerNotFound` if no async handler is registered for its type
    /// - `DispatchError::Handler` with the handler's own error
    pub async fn execute_async(&self, command: Option<&dyn Command>) -> Result<(), DispatchError> {
        let command = command.ok_or(DispatchError::InvalidRequest {
            kind: HandlerKind::Command,
        })?;
        let contract = self.cache.get_or_compute(
            HandlerKind::Command,
            HandlerMode::Async,
            command.request_type(),
            None,
        );

        let span = debug_span!(
            "dispatch",
            kind = "command",
            mode = "async",
            request = contract.request().name(),
        );

        async move {
            let handler = resolve_instance(self.resolver.as_ref(), &contract)?
                .async_command_handler()
                .ok_or_else(|| DispatchError::not_found(&contract))?;
            let signal = self.cancellation.current();

            handler
                .execute_async(command, signal)
                .await
                .map_err(DispatchError::Handler)
        }
        .instrument(span)
        .await
    }

    /// Typed shorthand for [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn send<C: Command>(&self, command: &C) -> Result<(), DispatchError> {
        self.execute(Some(command as &dyn Command))
    }

    /// Typed shorthand for [`execute_async`](Self::execute_async).
    ///
    /// # Errors
    ///
    /// See [`execute_async`](Self::execute_async).
    pub async fn send_async<C: Command>(&self, command: &C) -> Result<(), DispatchError> {
        self.execute_async(Some(command as &dyn Command)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rebar_core::{
        AsyncCommandHandler, CancellationSignal, CommandHandler, HandlerContract, HandlerInstance,
    };

    use super::*;
    use crate::cancellation::NeverCancelled;
    use crate::resolve::{HandlerLifetime, HandlerRegistry};

    struct Greet {
        name: String,
    }
    impl Command for Greet {}

    struct Unhandled;
    impl Command for Unhandled {}

    #[derive(Default)]
    struct GreetHandler {
        seen: Mutex<Vec<String>>,
    }

    impl CommandHandler<Greet> for GreetHandler {
        fn execute(&self, command: &Greet) -> anyhow::Result<()> {
            self.seen.lock().push(command.name.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl AsyncCommandHandler<Greet> for GreetHandler {
        async fn execute_async(
            &self,
            command: &Greet,
            signal: CancellationSignal,
        ) -> anyhow::Result<()> {
            signal.check()?;
            self.seen.lock().push(format!("async:{}", command.name));
            Ok(())
        }
    }

    struct FailingHandler;

    impl CommandHandler<Greet> for FailingHandler {
        fn execute(&self, _command: &Greet) -> anyhow::Result<()> {
            anyhow::bail!("greeting rejected")
        }
    }

    /// Resolver that counts calls and never finds anything.
    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicU32,
    }

    impl Resolver for CountingResolver {
        fn try_resolve(&self, _contract: &HandlerContract) -> Option<HandlerInstance> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    fn dispatcher_with(handler: &Arc<GreetHandler>) -> CommandDispatcher {
        let registry = HandlerRegistry::new();
        let sync = Arc::clone(handler);
        registry
            .register_command::<Greet, _, _>(HandlerLifetime::Singleton, move || Arc::clone(&sync))
            .unwrap();
        let not_sync = Arc::clone(handler);
        registry
            .register_async_command::<Greet, _, _>(HandlerLifetime::Singleton, move || {
                Arc::clone(&not_sync)
            })
            .unwrap();

        CommandDispatcher::new(Arc::new(registry), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()))
    }

    #[test]
    fn greet_scenario_records_name_once() {
        let handler = Arc::new(GreetHandler::default());
        let dispatcher = dispatcher_with(&handler);

        dispatcher
            .send(&Greet {
                name: "Alice".to_string(),
            })
            .unwrap();

        assert_eq!(*handler.seen.lock(), vec!["Alice".to_string()]);
    }

    #[test]
    fn absent_command_is_invalid_and_skips_resolver() {
        let resolver = Arc::new(CountingResolver::default());
        let dispatcher = CommandDispatcher::new(resolver.clone(), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()));

        let err = dispatcher.execute(None).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::InvalidRequest {
                kind: HandlerKind::Command
            }
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.cache().is_empty());
    }

    #[test]
    fn unregistered_command_is_not_found_but_cached() {
        let resolver = Arc::new(CountingResolver::default());
        let dispatcher = CommandDispatcher::new(resolver.clone(), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()));

        for _ in 0..2 {
            let err = dispatcher.send(&Unhandled).unwrap_err();
            assert!(matches!(
                err,
                DispatchError::HandlerNotFound { request, .. } if request.ends_with("Unhandled")
            ));
        }

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.cache().synthesis_count(), 1);
    }

    #[test]
    fn handler_error_propagates_unchanged() {
        let registry = HandlerRegistry::new();
        registry
            .register_command::<Greet, _, _>(HandlerLifetime::Transient, || FailingHandler)
            .unwrap();
        let dispatcher = CommandDispatcher::new(Arc::new(registry), Arc::new(NeverCancelled));

        let err = dispatcher
            .send(&Greet {
                name: "Bob".to_string(),
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "greeting rejected");
        assert!(err.handler_error().is_some());
    }

    #[tokio::test]
    async fn async_path_uses_async_contract() {
        let handler = Arc::new(GreetHandler::default());
        let dispatcher = dispatcher_with(&handler);

        dispatcher
            .send_async(&Greet {
                name: "Carol".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(*handler.seen.lock(), vec!["async:Carol".to_string()]);
    }

    #[tokio::test]
    async fn sync_only_registration_is_not_found_on_async_path() {
        let registry = HandlerRegistry::new();
        registry
            .register_command::<Greet, _, _>(HandlerLifetime::Transient, GreetHandler::default)
            .unwrap();
        let dispatcher = CommandDispatcher::new(Arc::new(registry), Arc::new(NeverCancelled));

        let err = dispatcher
            .send_async(&Greet {
                name: "Dan".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::HandlerNotFound { ref contract, .. }
                if contract.starts_with("AsyncCommandHandler<")
        ));
    }

    #[tokio::test]
    async fn absent_command_is_invalid_on_async_path_and_skips_resolver() {
        let resolver = Arc::new(CountingResolver::default());
        let dispatcher = CommandDispatcher::new(resolver.clone(), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()));

        let err = dispatcher.execute_async(None).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::InvalidRequest {
                kind: HandlerKind::Command
            }
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.cache().is_empty());
    }
}
