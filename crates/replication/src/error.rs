//! Error types for group selection and write acknowledgment.

use thiserror::Error;

use crate::quorum::QuorumReport;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ReplicationError>;

#[derive(Debug, Error)]
pub enum ReplicationError {
    /// A refresh cycle could not obtain a snapshot. Never reaches request paths.
    #[error("balancer unavailable: {0}")]
    BalancerUnavailable(String),

    /// An update carried a stamp older than the published one.
    #[error("stale update rejected: stamp {stamp} is older than published stamp {current}")]
    StaleUpdateRejected { stamp: u64, current: u64 },

    /// Neither the cache nor the static configuration yielded any group.
    #[error("no viable groups")]
    NoViableGroups,

    /// Fewer groups resolved than the replication requirement.
    #[error("insufficient groups: need {needed}, got {got}")]
    InsufficientGroups { needed: usize, got: usize },

    /// Post-write aggregate failure; the report holds every per-group outcome.
    #[error(
        "quorum not met: {} of {} groups succeeded, {} required",
        .report.succeeded(),
        .report.total(),
        .report.required
    )]
    QuorumNotMet { report: QuorumReport },

    /// The success-copies policy asks for more copies than groups selected.
    #[error("quorum requires {required} copies but only {total} groups were selected")]
    QuorumExceedsGroups { required: usize, total: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] corelib::Error),
}
