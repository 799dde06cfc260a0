//! Core type definitions for Weft.
//!
//! This crate defines the small, dependency-free types the runtime is built on:
//! - Instance identifiers and the allocator that hands them out
//! - Definition handles into the runtime's definition arena
//! - Option generations, the cache key used by configuration resolution
//! - The build mode flag (development vs. production)
//!
//! Everything that carries behavior (options, merge rules, the construction
//! pipeline) lives in `weft-runtime`.

mod counter;
mod ids;
mod mode;

pub use counter::{GenerationCounter, UidAllocator};
pub use ids::{DefinitionId, Generation, Uid};
pub use mode::BuildMode;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unknown build mode: {0}")]
    UnknownBuildMode(String),
}
