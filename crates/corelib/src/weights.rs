//! Weight snapshots published by the balancer.
//!
//! The balancer partitions objects into size classes. Each size class carries
//! its own list of replica sets (pre-formed lists of groups) together with a
//! relative weight reflecting free capacity and load.
//!
//! # Invariants
//!
//! - A snapshot has at least one size class
//! - Size class thresholds are strictly increasing
//! - Every replica set names at least one group
//! - Zero-weight replica sets are kept; they are only eligible when no
//!   positive-weight set exists in the same class
//!
//! Snapshots are immutable once built. The only way to obtain one is through
//! [`WeightSnapshot::new`] (or deserialization, which goes through the same
//! validation), so a `WeightSnapshot` value is always well formed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::group::GroupId;

/// A replica set and its relative preference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSetWeight {
    /// Groups written together. Never split or reordered.
    pub group_ids: Vec<GroupId>,
    pub weight: u64,
}

impl GroupSetWeight {
    pub fn new(group_ids: Vec<GroupId>, weight: u64) -> Self {
        Self { group_ids, weight }
    }
}

/// All replica sets serving objects up to `size_threshold` bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeClassWeights {
    pub size_threshold: u64,
    pub entries: Vec<GroupSetWeight>,
}

impl SizeClassWeights {
    pub fn new(size_threshold: u64, entries: Vec<GroupSetWeight>) -> Self {
        Self {
            size_threshold,
            entries,
        }
    }

    /// Entries a selection may pick from.
    ///
    /// Positive-weight entries when any exist, otherwise every (zero-weight)
    /// entry. Empty only when the class itself has no entries.
    pub fn eligible(&self) -> Vec<&GroupSetWeight> {
        let positive: Vec<&GroupSetWeight> =
            self.entries.iter().filter(|e| e.weight > 0).collect();
        if positive.is_empty() {
            self.entries.iter().collect()
        } else {
            positive
        }
    }
}

/// Immutable, validated view of the balancer's published weights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SizeClassWeights>", into = "Vec<SizeClassWeights>")]
pub struct WeightSnapshot {
    size_classes: Vec<SizeClassWeights>,
}

impl WeightSnapshot {
    /// Build a snapshot, rejecting anything that breaks the module invariants.
    pub fn new(size_classes: Vec<SizeClassWeights>) -> Result<Self> {
        Self::validate(&size_classes)?;
        Ok(Self { size_classes })
    }

    /// Check the invariants without taking ownership.
    pub fn validate(size_classes: &[SizeClassWeights]) -> Result<()> {
        if size_classes.is_empty() {
            return Err(Error::MalformedSnapshot("no size classes".into()));
        }

        for pair in size_classes.windows(2) {
            if pair[0].size_threshold >= pair[1].size_threshold {
                return Err(Error::MalformedSnapshot(format!(
                    "thresholds not strictly increasing: {} then {}",
                    pair[0].size_threshold, pair[1].size_threshold
                )));
            }
        }

        for class in size_classes {
            if class.entries.iter().any(|e| e.group_ids.is_empty()) {
                return Err(Error::MalformedSnapshot(format!(
                    "empty group set in size class {}",
                    class.size_threshold
                )));
            }
        }

        Ok(())
    }

    pub fn size_classes(&self) -> &[SizeClassWeights] {
        &self.size_classes
    }

    /// Size class serving an object of `size` bytes.
    ///
    /// The class with the smallest threshold that is `>= size`; objects larger
    /// than every threshold fall into the largest class.
    pub fn class_for_size(&self, size: u64) -> &SizeClassWeights {
        let idx = self
            .size_classes
            .partition_point(|class| class.size_threshold < size);
        let idx = idx.min(self.size_classes.len() - 1);
        &self.size_classes[idx]
    }
}

impl TryFrom<Vec<SizeClassWeights>> for WeightSnapshot {
    type Error = Error;

    fn try_from(size_classes: Vec<SizeClassWeights>) -> Result<Self> {
        Self::new(size_classes)
    }
}

impl From<WeightSnapshot> for Vec<SizeClassWeights> {
    fn from(snapshot: WeightSnapshot) -> Self {
        snapshot.size_classes
    }
}
