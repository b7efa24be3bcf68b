use rebar_core::{Cancelled, HandlerContract, HandlerKind};

/// Errors returned by `CommandDispatcher` and `QueryDispatcher`.
///
/// Every error is the outcome of a single dispatch attempt; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No request was passed to the dispatcher. Raised before any resolution.
    #[error("no {kind} was provided to dispatch")]
    InvalidRequest { kind: HandlerKind },
    /// The resolver had no handler for the request's contract.
    #[error("no handler registered for {request} (expected {contract})")]
    HandlerNotFound {
        request: &'static str,
        contract: String,
    },
    /// The handler itself failed. Display and source are the handler's own.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    pub(crate) fn not_found(contract: &HandlerContract) -> Self {
        Self::HandlerNotFound {
            request: contract.request().name(),
            contract: contract.name().to_string(),
        }
    }

    /// The handler's error, if the handler ran and failed.
    #[must_use]
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }

    /// `true` when the handler stopped because its cancellation signal fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handler_error()
            .is_some_and(|err| err.downcast_ref::<Cancelled>().is_some())
    }
}
