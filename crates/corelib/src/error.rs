//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Snapshot violates an ordering or shape invariant
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// Invalid group identifier or group list
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    /// Unparseable or out-of-range success-copies value
    #[error("Invalid quorum: {0}")]
    InvalidQuorum(String),
}
