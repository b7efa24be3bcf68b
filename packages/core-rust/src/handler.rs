//! Handler capability traits.
//!
//! A handler is bound to exactly one request type (and, for queries, one
//! response type) and implements one or both execution modes. Each mode is a
//! separate trait so a request type can have a sync handler, an async handler,
//! or both.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancellation::CancellationSignal;
use crate::request::{Command, Query, QueryResponse};

/// Synchronous handler for command `C`.
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    /// Handle the command. Errors propagate to the dispatcher's caller unchanged.
    ///
    /// # Errors
    ///
    /// Whatever the handler's business logic reports.
    fn execute(&self, command: &C) -> anyhow::Result<()>;
}

/// Asynchronous handler for command `C`.
#[async_trait]
pub trait AsyncCommandHandler<C: Command>: Send + Sync + 'static {
    /// Handle the command. `signal` is tied to the calling operation; handlers
    /// are expected to observe it and stop promptly once it is cancelled.
    ///
    /// # Errors
    ///
    /// Whatever the handler's business logic reports, or
    /// [`Cancelled`](crate::Cancelled) when it stopped early.
    async fn execute_async(&self, command: &C, signal: CancellationSignal) -> anyhow::Result<()>;
}

/// Synchronous handler answering query `Q` with `R`.
pub trait QueryHandler<Q: Query<R>, R: QueryResponse>: Send + Sync + 'static {
    /// # Errors
    ///
    /// Whatever the handler's business logic reports.
    fn execute(&self, query: &Q) -> anyhow::Result<R>;
}

/// Asynchronous handler answering query `Q` with `R`.
#[async_trait]
pub trait AsyncQueryHandler<Q: Query<R>, R: QueryResponse>: Send + Sync + 'static {
    /// # Errors
    ///
    /// Whatever the handler's business logic reports, or
    /// [`Cancelled`](crate::Cancelled) when it stopped early.
    async fn execute_async(&self, query: &Q, signal: CancellationSignal) -> anyhow::Result<R>;
}

// Shared handlers: an `Arc<H>` handles whatever `H` handles.

impl<C: Command, H: CommandHandler<C> + ?Sized> CommandHandler<C> for Arc<H> {
    fn execute(&self, command: &C) -> anyhow::Result<()> {
        (**self).execute(command)
    }
}

#[async_trait]
impl<C: Command, H: AsyncCommandHandler<C> + ?Sized> AsyncCommandHandler<C> for Arc<H> {
    async fn execute_async(&self, command: &C, signal: CancellationSignal) -> anyhow::Result<()> {
        (**self).execute_async(command, signal).await
    }
}

impl<Q, R, H> QueryHandler<Q, R> for Arc<H>
where
    Q: Query<R>,
    R: QueryResponse,
    H: QueryHandler<Q, R> + ?Sized,
{
    fn execute(&self, query: &Q) -> anyhow::Result<R> {
        (**self).execute(query)
    }
}

#[async_trait]
impl<Q, R, H> AsyncQueryHandler<Q, R> for Arc<H>
where
    Q: Query<R>,
    R: QueryResponse,
    H: AsyncQueryHandler<Q, R> + ?Sized,
{
    async fn execute_async(&self, query: &Q, signal: CancellationSignal) -> anyhow::Result<R> {
        (**self).execute_async(query, signal).await
    }
}
