//! Success-copies policy.
//!
//! After the storage layer has attempted a write on every selected group it
//! reports one [`GroupOutcome`] per group, in selection order. The policy
//! decides whether enough copies landed for the write to be acknowledged.
//!
//! Configuration encodes the policy as a single integer: `-1` any copy,
//! `-2` a strict majority, `-3` every group, and a positive `n` for an exact
//! number of copies.

use std::fmt;
use std::str::FromStr;

use corelib::GroupId;

use crate::error::{ReplicationError, Result};

/// How many successful copies acknowledge a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuorumSpec {
    /// At least one group.
    Any,
    /// Strictly more than half of the groups.
    Quorum,
    /// Every group.
    All,
    /// At least `n` groups (`n > 0`).
    Exact(usize),
}

impl QuorumSpec {
    pub const ANY_CODE: i32 = -1;
    pub const QUORUM_CODE: i32 = -2;
    pub const ALL_CODE: i32 = -3;

    /// Decode the configuration integer.
    pub fn from_success_copies(code: i32) -> corelib::Result<Self> {
        match code {
            Self::ANY_CODE => Ok(QuorumSpec::Any),
            Self::QUORUM_CODE => Ok(QuorumSpec::Quorum),
            Self::ALL_CODE => Ok(QuorumSpec::All),
            n if n > 0 => Ok(QuorumSpec::Exact(n as usize)),
            n => Err(corelib::Error::InvalidQuorum(format!(
                "success copies must be -1, -2, -3 or positive, got {}",
                n
            ))),
        }
    }

    /// Encode back into the configuration integer.
    pub fn success_copies(&self) -> i32 {
        match self {
            QuorumSpec::Any => Self::ANY_CODE,
            QuorumSpec::Quorum => Self::QUORUM_CODE,
            QuorumSpec::All => Self::ALL_CODE,
            QuorumSpec::Exact(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }

    /// Minimum number of successful groups out of `total`.
    ///
    /// Fails when nothing was selected, or when an exact count exceeds the
    /// number of selected groups (a configuration error, detected before I/O).
    pub fn required_copies(&self, total: usize) -> Result<usize> {
        if total == 0 {
            return Err(ReplicationError::NoViableGroups);
        }
        match *self {
            QuorumSpec::Any => Ok(1),
            QuorumSpec::Quorum => Ok(total / 2 + 1),
            QuorumSpec::All => Ok(total),
            QuorumSpec::Exact(n) if n > total => {
                Err(ReplicationError::QuorumExceedsGroups { required: n, total })
            }
            QuorumSpec::Exact(n) => Ok(n),
        }
    }

    /// Judge a finished write.
    ///
    /// Returns the full report on success and [`ReplicationError::QuorumNotMet`]
    /// carrying the same report on failure, so callers can retry the failed
    /// subset either way.
    pub fn evaluate(&self, outcomes: Vec<GroupOutcome>) -> Result<QuorumReport> {
        let required = self.required_copies(outcomes.len())?;
        let report = QuorumReport {
            spec: *self,
            required,
            outcomes,
        };
        if report.is_met() {
            Ok(report)
        } else {
            Err(ReplicationError::QuorumNotMet { report })
        }
    }
}

impl fmt::Display for QuorumSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuorumSpec::Any => write!(f, "any"),
            QuorumSpec::Quorum => write!(f, "quorum"),
            QuorumSpec::All => write!(f, "all"),
            QuorumSpec::Exact(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for QuorumSpec {
    type Err = corelib::Error;

    /// Accepts `any`, `quorum`, `all`, or the configuration integer.
    fn from_str(s: &str) -> corelib::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(QuorumSpec::Any),
            "quorum" => Ok(QuorumSpec::Quorum),
            "all" => Ok(QuorumSpec::All),
            other => other
                .parse::<i32>()
                .map_err(|_| corelib::Error::InvalidQuorum(format!("unknown policy {:?}", s)))
                .and_then(QuorumSpec::from_success_copies),
        }
    }
}

/// Result of the write on one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: GroupId,
    pub status: OutcomeStatus,
}

impl GroupOutcome {
    pub fn success(group: GroupId) -> Self {
        Self {
            group,
            status: OutcomeStatus::Succeeded,
        }
    }

    pub fn failure(group: GroupId, reason: impl Into<String>) -> Self {
        Self {
            group,
            status: OutcomeStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Aggregate verdict plus the per-group detail it was computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumReport {
    pub spec: QuorumSpec,
    /// Successes needed for the policy to pass.
    pub required: usize,
    /// Outcomes in selection order.
    pub outcomes: Vec<GroupOutcome>,
}

impl QuorumReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn is_met(&self) -> bool {
        self.succeeded() >= self.required
    }

    pub fn succeeded_groups(&self) -> Vec<GroupId> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.group)
            .collect()
    }

    /// Groups a caller may want to retry.
    pub fn failed_groups(&self) -> Vec<GroupId> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.group)
            .collect()
    }
}
