//! Type-erased handler instances.
//!
//! Dispatchers only know a request through `&dyn Command` / `&dyn Query<R>`.
//! Typed handlers are wrapped in adapters that downcast the request back to
//! its concrete type, then stored behind the object-safe `Erased*` traits so a
//! `Resolver` can hand them out as a single `HandlerInstance` type.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cancellation::CancellationSignal;
use crate::contract::{ContractKey, HandlerMode};
use crate::handler::{AsyncCommandHandler, AsyncQueryHandler, CommandHandler, QueryHandler};
use crate::request::{Command, Query, QueryResponse};

// ---------------------------------------------------------------------------
// Object-safe handler traits
// ---------------------------------------------------------------------------

pub trait ErasedCommandHandler: Send + Sync {
    /// # Errors
    ///
    /// The wrapped handler's error.
    fn execute(&self, command: &dyn Command) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ErasedAsyncCommandHandler: Send + Sync {
    /// # Errors
    ///
    /// The wrapped handler's error.
    async fn execute_async(
        &self,
        command: &dyn Command,
        signal: CancellationSignal,
    ) -> anyhow::Result<()>;
}

pub trait ErasedQueryHandler<R: QueryResponse>: Send + Sync {
    /// # Errors
    ///
    /// The wrapped handler's error.
    fn execute(&self, query: &dyn Query<R>) -> anyhow::Result<R>;
}

#[async_trait]
pub trait ErasedAsyncQueryHandler<R: QueryResponse>: Send + Sync {
    /// # Errors
    ///
    /// The wrapped handler's error.
    async fn execute_async(
        &self,
        query: &dyn Query<R>,
        signal: CancellationSignal,
    ) -> anyhow::Result<R>;
}

fn downcast<T: Any>(request: &dyn Any) -> anyhow::Result<&T> {
    request
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("request is not a {}", type_name::<T>()))
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

struct CommandAdapter<C, H> {
    handler: H,
    _request: PhantomData<fn(&C)>,
}

impl<C: Command, H: CommandHandler<C>> ErasedCommandHandler for CommandAdapter<C, H> {
    fn execute(&self, command: &dyn Command) -> anyhow::Result<()> {
        self.handler.execute(downcast::<C>(command.as_any())?)
    }
}

struct AsyncCommandAdapter<C, H> {
    handler: H,
    _request: PhantomData<fn(&C)>,
}

#[async_trait]
impl<C: Command, H: AsyncCommandHandler<C>> ErasedAsyncCommandHandler
    for AsyncCommandAdapter<C, H>
{
    async fn execute_async(
        &self,
        command: &dyn Command,
        signal: CancellationSignal,
    ) -> anyhow::Result<()> {
        let command = downcast::<C>(command.as_any())?;
        self.handler.execute_async(command, signal).await
    }
}

struct QueryAdapter<Q, R, H> {
    handler: H,
    _request: PhantomData<fn(&Q) -> R>,
}

impl<Q, R, H> ErasedQueryHandler<R> for QueryAdapter<Q, R, H>
where
    Q: Query<R>,
    R: QueryResponse,
    H: QueryHandler<Q, R>,
{
    fn execute(&self, query: &dyn Query<R>) -> anyhow::Result<R> {
        self.handler.execute(downcast::<Q>(query.as_any())?)
    }
}

struct AsyncQueryAdapter<Q, R, H> {
    handler: H,
    _request: PhantomData<fn(&Q) -> R>,
}

#[async_trait]
impl<Q, R, H> ErasedAsyncQueryHandler<R> for AsyncQueryAdapter<Q, R, H>
where
    Q: Query<R>,
    R: QueryResponse,
    H: AsyncQueryHandler<Q, R>,
{
    async fn execute_async(
        &self,
        query: &dyn Query<R>,
        signal: CancellationSignal,
    ) -> anyhow::Result<R> {
        let query = downcast::<Q>(query.as_any())?;
        self.handler.execute_async(query, signal).await
    }
}

// ---------------------------------------------------------------------------
// HandlerInstance
// ---------------------------------------------------------------------------

/// A resolved handler, ready to be invoked by a dispatcher.
///
/// Cloning is cheap: the handler itself sits behind an `Arc`.
#[derive(Clone)]
pub struct HandlerInstance {
    key: ContractKey,
    handler_type: &'static str,
    erased: Arc<dyn Any + Send + Sync>,
}

impl HandlerInstance {
    /// Wraps a synchronous command handler.
    pub fn command<C: Command, H: CommandHandler<C>>(handler: H) -> Self {
        let erased: Arc<dyn ErasedCommandHandler> = Arc::new(CommandAdapter {
            handler,
            _request: PhantomData::<fn(&C)>,
        });
        Self::new::<H>(ContractKey::command::<C>(HandlerMode::Sync), erased)
    }

    /// Wraps an asynchronous command handler.
    pub fn async_command<C: Command, H: AsyncCommandHandler<C>>(handler: H) -> Self {
        let erased: Arc<dyn ErasedAsyncCommandHandler> = Arc::new(AsyncCommandAdapter {
            handler,
            _request: PhantomData::<fn(&C)>,
        });
        Self::new::<H>(ContractKey::command::<C>(HandlerMode::Async), erased)
    }

    /// Wraps a synchronous query handler.
    pub fn query<Q, R, H>(handler: H) -> Self
    where
        Q: Query<R>,
        R: QueryResponse,
        H: QueryHandler<Q, R>,
    {
        let erased: Arc<dyn ErasedQueryHandler<R>> = Arc::new(QueryAdapter {
            handler,
            _request: PhantomData::<fn(&Q) -> R>,
        });
        Self::new::<H>(ContractKey::query::<Q, R>(HandlerMode::Sync), erased)
    }

    /// Wraps an asynchronous query handler.
    pub fn async_query<Q, R, H>(handler: H) -> Self
    where
        Q: Query<R>,
        R: QueryResponse,
        H: AsyncQueryHandler<Q, R>,
    {
        let erased: Arc<dyn ErasedAsyncQueryHandler<R>> = Arc::new(AsyncQueryAdapter {
            handler,
            _request: PhantomData::<fn(&Q) -> R>,
        });
        Self::new::<H>(ContractKey::query::<Q, R>(HandlerMode::Async), erased)
    }

    fn new<H>(key: ContractKey, erased: impl Any + Send + Sync) -> Self {
        Self {
            key,
            handler_type: type_name::<H>(),
            erased: Arc::new(erased),
        }
    }

    /// Contract this instance fulfils.
    #[must_use]
    pub fn key(&self) -> ContractKey {
        self.key
    }

    /// Name of the concrete handler type, for diagnostics.
    #[must_use]
    pub fn handler_type(&self) -> &'static str {
        self.handler_type
    }

    #[must_use]
    pub fn command_handler(&self) -> Option<Arc<dyn ErasedCommandHandler>> {
        self.erased
            .downcast_ref::<Arc<dyn ErasedCommandHandler>>()
            .cloned()
    }

    #[must_use]
    pub fn async_command_handler(&self) -> Option<Arc<dyn ErasedAsyncCommandHandler>> {
        self.erased
            .downcast_ref::<Arc<dyn ErasedAsyncCommandHandler>>()
            .cloned()
    }

    #[must_use]
    pub fn query_handler<R: QueryResponse>(&self) -> Option<Arc<dyn ErasedQueryHandler<R>>> {
        self.erased
            .downcast_ref::<Arc<dyn ErasedQueryHandler<R>>>()
            .cloned()
    }

    #[must_use]
    pub fn async_query_handler<R: QueryResponse>(
        &self,
    ) -> Option<Arc<dyn ErasedAsyncQueryHandler<R>>> {
        self.erased
            .downcast_ref::<Arc<dyn ErasedAsyncQueryHandler<R>>>()
            .cloned()
    }
}

impl fmt::Debug for HandlerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstance")
            .field("key", &self.key)
            .field("handler_type", &self.handler_type)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
