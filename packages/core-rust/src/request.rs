use std::any::{type_name, Any, TypeId};
use std::fmt;

// ---------------------------------------------------------------------------
// TypeInfo
// ---------------------------------------------------------------------------

/// Runtime identity of a Rust type: its `TypeId` plus its name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Identity of `T`.
    #[must_use]
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `my_app::orders::PlaceOrder`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Anything that can travel through a dispatcher.
///
/// Implemented for every `'static + Send + Sync` type. Going through this trait
/// (rather than `TypeId::of`) lets a dispatcher holding a `&dyn Command` or
/// `&dyn Query<R>` see the concrete type behind the trait object.
pub trait Request: Any + Send + Sync {
    /// Upcast to `&dyn Any` for downcasting back to the concrete request type.
    fn as_any(&self) -> &dyn Any;

    /// Runtime type of the request value.
    fn request_type(&self) -> TypeInfo;
}

impl<T: Any + Send + Sync> Request for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn request_type(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }
}

/// A request dispatched for its side effects. Carries no declared response.
///
/// ```
/// use rebar_core::Command;
///
/// struct Greet {
///     name: String,
/// }
///
/// impl Command for Greet {}
/// ```
pub trait Command: Request {}

/// Marker for types that may be returned from a query handler.
pub trait QueryResponse: Send + 'static {}

/// A request dispatched for a value of type `R`.
///
/// ```
/// use rebar_core::{Query, QueryResponse};
///
/// struct GetCount;
///
/// struct IntResponse {
///     value: i64,
/// }
///
/// impl QueryResponse for IntResponse {}
/// impl Query<IntResponse> for GetCount {}
/// ```
pub trait Query<R: QueryResponse>: Request {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
