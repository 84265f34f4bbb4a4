//! Engine errors.

use replica_model::HeapError;

/// Errors from the clone entry points.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CloneError {
    /// Clone-into between incompatible concrete types, or into a value
    /// that has no writable identity (inline values, strings).
    #[error("invalid clone operation: {0}")]
    InvalidOperation(String),

    /// The source of a clone-into was null.
    #[error("clone source is null")]
    NullArgument,

    /// The heap rejected an operation mid-clone. Only reachable with an
    /// inconsistent heap, such as references from a different arena.
    #[error(transparent)]
    Heap(#[from] HeapError),
}

/// Errors from installing the engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("clone engine is already configured")]
    AlreadyConfigured,

    #[error("invalid value `{value}` for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
