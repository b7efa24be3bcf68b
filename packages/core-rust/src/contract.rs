//! Handler contracts: the abstract handler shape a request must be resolved to.

use std::any::TypeId;
use std::fmt;

use crate::request::{Command, Query, QueryResponse, TypeInfo};

/// Whether a contract serves commands or queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Command,
    Query,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Query => f.write_str("query"),
        }
    }
}

/// Execution mode of a handler entry point.
///
/// Sync and async handlers for the same request type are separate contracts,
/// registered and resolved independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerMode {
    Sync,
    Async,
}

impl fmt::Display for HandlerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

// ---------------------------------------------------------------------------
// ContractKey
// ---------------------------------------------------------------------------

/// Identity of a handler contract. Response type is `Some` exactly for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub kind: HandlerKind,
    pub mode: HandlerMode,
    pub request: TypeId,
    pub response: Option<TypeId>,
}

impl ContractKey {
    #[must_use]
    pub fn command<C: Command>(mode: HandlerMode) -> Self {
        Self {
            kind: HandlerKind::Command,
            mode,
            request: TypeId::of::<C>(),
            response: None,
        }
    }

    #[must_use]
    pub fn query<Q: Query<R>, R: QueryResponse>(mode: HandlerMode) -> Self {
        Self {
            kind: HandlerKind::Query,
            mode,
            request: TypeId::of::<Q>(),
            response: Some(TypeId::of::<R>()),
        }
    }
}

// ---------------------------------------------------------------------------
// HandlerContract
// ---------------------------------------------------------------------------

/// A synthesized handler contract, e.g. `AsyncQueryHandler<GetCount, IntResponse>`.
///
/// Contracts are symbolic: building one never instantiates a handler. A
/// `Resolver` turns a contract into a `HandlerInstance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContract {
    key: ContractKey,
    request: TypeInfo,
    response: Option<TypeInfo>,
    name: String,
}

impl HandlerContract {
    /// Parameterize the generic handler shape for `kind`/`mode` with the given
    /// request (and, for queries, response) types.
    #[must_use]
    pub fn synthesize(
        kind: HandlerKind,
        mode: HandlerMode,
        request: TypeInfo,
        response: Option<TypeInfo>,
    ) -> Self {
        let shape = shape_name(kind, mode);
        let name = match response {
            Some(response) => format!("{shape}<{request}, {response}>"),
            None => format!("{shape}<{request}>"),
        };
        Self {
            key: ContractKey {
                kind,
                mode,
                request: request.id(),
                response: response.map(|r| r.id()),
            },
            request,
            response,
            name,
        }
    }

    /// Contract served by a command handler for `C`.
    #[must_use]
    pub fn command<C: Command>(mode: HandlerMode) -> Self {
        Self::synthesize(HandlerKind::Command, mode, TypeInfo::of::<C>(), None)
    }

    /// Contract served by a query handler for `Q` answering with `R`.
    #[must_use]
    pub fn query<Q: Query<R>, R: QueryResponse>(mode: HandlerMode) -> Self {
        Self::synthesize(
            HandlerKind::Query,
            mode,
            TypeInfo::of::<Q>(),
            Some(TypeInfo::of::<R>()),
        )
    }

    #[must_use]
    pub fn key(&self) -> ContractKey {
        self.key
    }

    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.key.kind
    }

    #[must_use]
    pub fn mode(&self) -> HandlerMode {
        self.key.mode
    }

    #[must_use]
    pub fn request(&self) -> TypeInfo {
        self.request
    }

    #[must_use]
    pub fn response(&self) -> Option<TypeInfo> {
        self.response
    }

    /// Rendered contract name, used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for HandlerContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn shape_name(kind: HandlerKind, mode: HandlerMode) -> &'static str {
    match (kind, mode) {
        (HandlerKind::Command, HandlerMode::Sync) => "CommandHandler",
        (HandlerKind::Command, HandlerMode::Async) => "AsyncCommandHandler",
        (HandlerKind::Query, HandlerMode::Sync) => "QueryHandler",
        (HandlerKind::Query, HandlerMode::Async) => "AsyncQueryHandler",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
