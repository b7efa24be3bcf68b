//! `Rebar` Core: request markers, handler contracts, cancellation signal, and resolver ports.

pub mod cancellation;
pub mod contract;
pub mod handler;
pub mod instance;
pub mod request;
pub mod traits;

pub use cancellation::{CancellationSignal, Cancelled};
pub use contract::{ContractKey, HandlerContract, HandlerKind, HandlerMode};
pub use handler::{AsyncCommandHandler, AsyncQueryHandler, CommandHandler, QueryHandler};
pub use instance::{
    ErasedAsyncCommandHandler, ErasedAsyncQueryHandler, ErasedCommandHandler, ErasedQueryHandler,
    HandlerInstance,
};
pub use request::{Command, Query, QueryResponse, Request, TypeInfo};
pub use traits::{CancellationSource, Resolver};
