//! Error types for the runtime.

use thiserror::Error;
use weft_types::{DefinitionId, Uid};

/// Errors raised by a merge strategy.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("option '{key}' expects {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("option '{0}' has no value on either side")]
    MissingField(String),

    #[error("merge rule for '{key}' failed: {message}")]
    Rule { key: String, message: String },
}

/// Errors raised while resolving definitions or constructing instances.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown definition: {0}")]
    UnknownDefinition(DefinitionId),

    #[error("instance {uid}: parent render node carries no component options")]
    MissingComponentOptions { uid: Uid },

    #[error("instance {uid}: parent render node describes {found}, instance is of {expected}")]
    DefinitionMismatch {
        uid: Uid,
        expected: DefinitionId,
        found: DefinitionId,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("invalid runtime config: {0}")]
    Config(#[from] toml::de::Error),

    /// A hook or subsystem failed. The error is passed through unchanged.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
