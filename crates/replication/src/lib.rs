//! Group selection and write acknowledgment.
//!
//! This crate decides, for every storage operation, which groups to target:
//! - A weight cache fed by the balancer, read without locks
//! - A background refresh loop that keeps the cache current
//! - Group selection with static fallback and replication enforcement
//! - The success-copies (quorum) policy for acknowledging writes

pub mod cache;
pub mod config;
pub mod error;
pub mod quorum;
pub mod refresh;
pub mod router;
pub mod selector;

pub use cache::{BalancedWeightCache, WeightCache};
pub use config::{BalancerConfig, ProxyConfig};
pub use error::{ReplicationError, Result};
pub use quorum::{GroupOutcome, OutcomeStatus, QuorumReport, QuorumSpec};
pub use refresh::{RefreshConfig, RefreshHandle, RefreshLoop};
pub use router::GroupRouter;
pub use selector::{select_groups, GroupSelector, SelectionRequest};
