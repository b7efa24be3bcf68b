//! `tower::Service` adapters over the async dispatch paths.
//!
//! Lets an outer layer mount dispatch inside its own tower stack. The
//! adapters are always ready and add nothing on top of the dispatcher.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use rebar_core::{Command, Query, QueryResponse};
use tower::Service;

use crate::dispatch::{CommandDispatcher, DispatchError, QueryDispatcher};

/// Boxed future returned by the dispatch services.
pub type DispatchFuture<T> = Pin<Box<dyn Future<Output = Result<T, DispatchError>> + Send>>;

// ---------------------------------------------------------------------------
// CommandService
// ---------------------------------------------------------------------------

/// Sends each `C` it is called with through `CommandDispatcher::send_async`.
pub struct CommandService<C> {
    dispatcher: CommandDispatcher,
    _command: PhantomData<fn(C)>,
}

impl<C> CommandService<C> {
    #[must_use]
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self {
            dispatcher,
            _command: PhantomData,
        }
    }
}

impl<C> Clone for CommandService<C> {
    fn clone(&self) -> Self {
        Self::new(self.dispatcher.clone())
    }
}

impl<C: Command> Service<C> for CommandService<C> {
    type Response = ();
    type Error = DispatchError;
    type Future = DispatchFuture<()>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, command: C) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move { dispatcher.send_async(&command).await })
    }
}

// ---------------------------------------------------------------------------
// QueryService
// ---------------------------------------------------------------------------

/// Answers each `Q` it is called with through `QueryDispatcher::ask_async`.
pub struct QueryService<Q, R> {
    dispatcher: QueryDispatcher,
    _query: PhantomData<fn(Q) -> R>,
}

impl<Q, R> QueryService<Q, R> {
    #[must_use]
    pub fn new(dispatcher: QueryDispatcher) -> Self {
        Self {
            dispatcher,
            _query: PhantomData,
        }
    }
}

impl<Q, R> Clone for QueryService<Q, R> {
    fn clone(&self) -> Self {
        Self::new(self.dispatcher.clone())
    }
}

impl<Q: Query<R>, R: QueryResponse> Service<Q> for QueryService<Q, R> {
    type Response = R;
    type Error = DispatchError;
    type Future = DispatchFuture<R>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, query: Q) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move { dispatcher.ask_async::<Q, R>(&query).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
