//! Error types for balancer communication.

use thiserror::Error;

use crate::protocol::MessageType;

/// Result type alias for balancer operations.
pub type Result<T> = std::result::Result<T, BalancerError>;

#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("expected {expected:?} but balancer answered {got:?}")]
    UnexpectedMessage { expected: MessageType, got: MessageType },

    #[error("response stamp {received} does not match request stamp {sent}")]
    StampMismatch { sent: u64, received: u64 },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] corelib::Error),
}
