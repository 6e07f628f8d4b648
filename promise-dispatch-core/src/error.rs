//! Error types for values, actions and dispatch

use thiserror::Error;

/// A value had a different kind than the operation requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct TypeKindError {
    /// Kind the operation needed (e.g. `"record"`)
    pub expected: &'static str,
    /// Kind that was actually supplied
    pub found: &'static str,
}

impl TypeKindError {
    /// Create a new kind mismatch error.
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

/// A value could not be read as an [`Action`](crate::Action).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionShapeError {
    /// Actions are records
    #[error("action must be a record, found {0}")]
    NotARecord(&'static str),

    /// The `type` field is missing
    #[error("action is missing a `type` field")]
    MissingType,

    /// The `type` field is present but not a string
    #[error("action `type` must be a string, found {0}")]
    NonStringType(&'static str),

    /// The `error` field is present but not a bool
    #[error("action `error` must be a bool, found {0}")]
    NonBoolError(&'static str),

    /// A field other than `type`, `payload`, `meta` or `error`
    #[error("unexpected action field `{0}`")]
    UnknownField(String),
}

/// Errors surfaced by a dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A record operation was applied to a non-record value
    #[error(transparent)]
    TypeKind(#[from] TypeKindError),

    /// The store received a value that is not an action
    #[error("invalid action: {0}")]
    InvalidAction(#[from] ActionShapeError),

    /// A reducer panicked while holding the state lock
    #[error("store state lock poisoned")]
    StatePoisoned,

    /// A promise action was dispatched outside a tokio runtime, so its
    /// settlement could never be scheduled
    #[error("promise action `{0}` dispatched outside a tokio runtime")]
    NoRuntime(String),
}
