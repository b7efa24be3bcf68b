use std::sync::Arc;

use rebar_core::{
    CancellationSource, HandlerKind, HandlerMode, Query, QueryResponse, Resolver, TypeInfo,
};
use tracing::{debug_span, Instrument};

use super::cache::HandlerTypeCache;
use super::error::DispatchError;
use super::resolve_instance;

/// Executes queries and returns their typed responses.
///
/// The response type `R` is part of the handler contract: a handler is
/// resolved for the pair (runtime query type, `R`), never for the query type
/// alone.
#[derive(Clone)]
pub struct QueryDispatcher {
    resolver: Arc<dyn Resolver>,
    cancellation: Arc<dyn CancellationSource>,
    cache: Arc<HandlerTypeCache>,
}

impl QueryDispatcher {
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

    /// Same dispatcher, resolving through `resolver`.
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

    /// Runs the query through its synchronous `QueryHandler` and returns the
    /// handler's response.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidRequest` if `query` is `None`
    /// - `DispatchError::HandlerNotFound` if no sync handler is registered for (query type, `R`)
    /// - `DispatchError::Handler` with the handler's own error
    pub fn execute<R: QueryResponse>(
        &self,
        query: Option<&dyn Query<R>>,
    ) -> Result<R, DispatchError> {
        let query = query.ok_or(DispatchError::InvalidRequest {
            kind: HandlerKind::Query,
        })?;
        let contract = self.cache.get_or_compute(
            HandlerKind::Query,
            HandlerMode::Sync,
            query.request_type(),
            Some(TypeInfo::of::<R>()),
        );

        let _span = debug_span!(
            "dispatch",
            kind = "query",
            mode = "sync",
            request = contract.request().name(),
        )
        .entered();

        let handler = resolve_instance(self.resolver.as_ref(), &contract)?
            .query_handler::<R>()
            .ok_or_else(|| DispatchError::not_found(&contract))?;

        handler.execute(query).map_err(DispatchError::Handler)
    }

    /// Runs the query through its `AsyncQueryHandler`, passing the current
    /// cancellation signal, and awaits the response.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidRequest` if `query` is `None`
    /// - `DispatchError::HandlerNotFound` if no async handler is registered for (query type, `R`)
    /// - `DispatchError::Handler` with the handler's own error
    pub async fn execute_async<R: QueryResponse>(
        &self,
        query: Option<&dyn Query<R>>,
    ) -> Result<R, DispatchError> {
        let query = query.ok_or(DispatchError::InvalidRequest {
            kind: HandlerKind::Query,
        })?;
        let contract = self.cache.get_or_compute(
            HandlerKind::Query,
            HandlerMode::Async,
            query.request_type(),
            Some(TypeInfo::of::<R>()),
        );

        let span = debug_span!(
            "dispatch",
            kind = "query",
            mode = "async",
            request = contract.request().name(),
        );

        async move {
            let handler = resolve_instance(self.resolver.as_ref(), &contract)?
                .async_query_handler::<R>()
                .ok_or_else(|| DispatchError::not_found(&contract))?;
            let signal = self.cancellation.current();

            handler
                .execute_async(query, signal)
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
    pub fn ask<Q: Query<R>, R: QueryResponse>(&self, query: &Q) -> Result<R, DispatchError> {
        self.execute(Some(query as &dyn Query<R>))
    }

    /// Typed shorthand for [`execute_async`](Self::execute_async).
    ///
    /// # Errors
    ///
    /// See [`execute_async`](Self::execute_async).
    pub async fn ask_async<Q: Query<R>, R: QueryResponse>(
        &self,
        query: &Q,
    ) -> Result<R, DispatchError> {
        self.execute_async(Some(query as &dyn Query<R>)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use rebar_core::{
        AsyncQueryHandler, CancellationSignal, HandlerContract, HandlerInstance, QueryHandler,
    };

    use super::*;
    use crate::cancellation::{NeverCancelled, RequestScope};
    use crate::resolve::{HandlerLifetime, HandlerRegistry};

    #[derive(Debug, PartialEq, Eq)]
    struct IntResponse {
        value: i64,
    }
    impl QueryResponse for IntResponse {}

    #[derive(Debug, PartialEq, Eq)]
    struct TextResponse(String);
    impl QueryResponse for TextResponse {}

    struct GetCount;
    impl Query<IntResponse> for GetCount {}
    impl Query<TextResponse> for GetCount {}

    struct Unanswered;
    impl Query<IntResponse> for Unanswered {}

    struct CountHandler;

    impl QueryHandler<GetCount, IntResponse> for CountHandler {
        fn execute(&self, _query: &GetCount) -> anyhow::Result<IntResponse> {
            Ok(IntResponse { value: 42 })
        }
    }

    #[async_trait]
    impl AsyncQueryHandler<GetCount, IntResponse> for CountHandler {
        async fn execute_async(
            &self,
            _query: &GetCount,
            signal: CancellationSignal,
        ) -> anyhow::Result<IntResponse> {
            signal.check()?;
            Ok(IntResponse { value: 43 })
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

    fn dispatcher() -> QueryDispatcher {
        let registry = HandlerRegistry::new();
        registry
            .register_query::<GetCount, IntResponse, _, _>(HandlerLifetime::Singleton, || {
                CountHandler
            })
            .unwrap();
        registry
            .register_async_query::<GetCount, IntResponse, _, _>(
                HandlerLifetime::Singleton,
                || CountHandler,
            )
            .unwrap();
        QueryDispatcher::new(Arc::new(registry), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()))
    }

    #[test]
    fn get_count_scenario_returns_42() {
        let response: IntResponse = dispatcher().ask(&GetCount).unwrap();
        assert_eq!(response, IntResponse { value: 42 });
    }

    #[test]
    fn trait_object_query_is_resolved_by_runtime_type() {
        let query: &dyn Query<IntResponse> = &GetCount;
        let response = dispatcher().execute(Some(query)).unwrap();
        assert_eq!(response.value, 42);
    }

    #[test]
    fn absent_query_is_invalid() {
        let dispatcher = dispatcher();
        let err = dispatcher.execute::<IntResponse>(None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidRequest {
                kind: HandlerKind::Query
            }
        ));
        assert!(dispatcher.cache().is_empty());
    }

    #[test]
    fn response_type_selects_the_contract() {
        let dispatcher = dispatcher();

        let err = dispatcher.ask::<GetCount, TextResponse>(&GetCount).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::HandlerNotFound { ref contract, .. } if contract.contains("TextResponse")
        ));
        assert_eq!(dispatcher.cache().len(), 1);
    }

    #[test]
    fn unregistered_query_names_its_type() {
        let err = dispatcher()
            .ask::<Unanswered, IntResponse>(&Unanswered)
            .unwrap_err();
        assert!(err.to_string().contains("Unanswered"));
    }

    #[tokio::test]
    async fn async_path_returns_handler_value() {
        let response: IntResponse = dispatcher().ask_async(&GetCount).await.unwrap();
        assert_eq!(response.value, 43);
    }

    #[tokio::test]
    async fn absent_query_on_async_path_skips_resolver() {
        let resolver = Arc::new(CountingResolver::default());
        let dispatcher = QueryDispatcher::new(resolver.clone(), Arc::new(NeverCancelled))
            .with_cache(Arc::new(HandlerTypeCache::new()));

        let err = dispatcher
            .execute_async::<IntResponse>(None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::InvalidRequest {
                kind: HandlerKind::Query
            }
        ));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.cache().is_empty());
    }

    #[tokio::test]
    async fn async_path_sees_scope_cancellation() {
        let scope = Arc::new(RequestScope::new());
        let dispatcher = dispatcher().with_cancellation(scope.clone());
        scope.abort("client disconnected");

        let err = dispatcher
            .ask_async::<GetCount, IntResponse>(&GetCount)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(err.to_string().contains("client disconnected"));
    }
}
