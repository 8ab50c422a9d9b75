//! Balanced weight cache.
//!
//! # Publication
//!
//! The snapshot and its stamp live together in one immutable `Published`
//! value behind an `ArcSwapOption`. An update builds a fresh value and stores
//! it with a single atomic swap, so a reader sees either the old pair or the
//! new pair and never takes a lock. Writers serialize among themselves on a
//! mutex that readers never touch, which keeps the stamp comparison and the
//! swap atomic with respect to other writers.
//!
//! An update carrying the stamp already published is a retry of the same
//! refresh: it is acknowledged but never replaces the published snapshot.
//!
//! # Selection
//!
//! 1. Find the size class for the requested size (smallest threshold >=
//!    size, else the largest class)
//! 2. Keep the positive-weight entries, or every entry if none is positive
//! 3. Draw a point in `[0, total weight)` and walk the entries until it falls
//!    inside one; with no positive weight the draw is uniform
//!
//! # Performance
//!
//! - **choose**: O(log c + e) where c = size classes, e = entries in the class
//! - **update**: O(1) besides the writer lock

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use corelib::{GroupSetWeight, WeightSnapshot};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

use crate::cache::WeightCache;
use crate::error::{ReplicationError, Result};

#[derive(Debug)]
struct Published {
    snapshot: Arc<WeightSnapshot>,
    stamp: u64,
}

/// Weight cache backed by an atomically swapped snapshot.
///
/// # Example
///
/// ```rust
/// use corelib::group::groups;
/// use corelib::{GroupSetWeight, SizeClassWeights, WeightSnapshot};
/// use replication::cache::{BalancedWeightCache, WeightCache};
///
/// let cache = BalancedWeightCache::new();
/// assert!(cache.choose(2048).is_none());
///
/// let snapshot = WeightSnapshot::new(vec![SizeClassWeights::new(
///     1_048_576,
///     vec![GroupSetWeight::new(groups(&[4, 5]), 100)],
/// )])
/// .unwrap();
/// assert!(cache.update(snapshot, 1));
/// assert_eq!(cache.choose(2048).unwrap().group_ids, groups(&[4, 5]));
/// ```
#[derive(Debug, Default)]
pub struct BalancedWeightCache {
    current: ArcSwapOption<Published>,
    write_lock: Mutex<()>,
}

impl BalancedWeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`WeightCache::update`] but reports why a snapshot was rejected.
    pub fn try_update(&self, snapshot: WeightSnapshot, stamp: u64) -> Result<()> {
        let _guard = self.write_lock.lock();

        if let Some(current) = self.current.load().as_deref() {
            if stamp < current.stamp {
                metrics::counter!("weight_cache_update_rejected_total").increment(1);
                return Err(ReplicationError::StaleUpdateRejected {
                    stamp,
                    current: current.stamp,
                });
            }
            if stamp == current.stamp {
                debug!(stamp, "weight snapshot already published");
                return Ok(());
            }
        }

        let classes = snapshot.size_classes().len();
        self.current.store(Some(Arc::new(Published {
            snapshot: Arc::new(snapshot),
            stamp,
        })));
        debug!(stamp, classes, "published weight snapshot");
        Ok(())
    }

    /// [`WeightCache::choose`] with a caller-provided random source.
    pub fn choose_with<R: Rng + ?Sized>(
        &self,
        requested_size: u64,
        rng: &mut R,
    ) -> Option<GroupSetWeight> {
        let guard = self.current.load();
        let published = guard.as_deref()?;
        let class = published.snapshot.class_for_size(requested_size);
        pick_weighted(&class.eligible(), rng).cloned()
    }
}

impl WeightCache for BalancedWeightCache {
    fn update(&self, snapshot: WeightSnapshot, stamp: u64) -> bool {
        match self.try_update(snapshot, stamp) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "weight snapshot rejected");
                false
            }
        }
    }

    fn choose(&self, requested_size: u64) -> Option<GroupSetWeight> {
        self.choose_with(requested_size, &mut rand::thread_rng())
    }

    fn initialized(&self) -> bool {
        self.current.load().is_some()
    }

    fn stamp(&self) -> Option<u64> {
        self.current.load().as_deref().map(|p| p.stamp)
    }

    fn snapshot(&self) -> Option<Arc<WeightSnapshot>> {
        self.current
            .load()
            .as_deref()
            .map(|p| Arc::clone(&p.snapshot))
    }
}

/// Weighted draw over `candidates`.
///
/// Probability of an entry is its weight over the sum of weights. When the
/// sum is zero every candidate is equally likely.
pub fn pick_weighted<'a, R: Rng + ?Sized>(
    candidates: &[&'a GroupSetWeight],
    rng: &mut R,
) -> Option<&'a GroupSetWeight> {
    if candidates.is_empty() {
        return None;
    }

    let total: u128 = candidates.iter().map(|c| c.weight as u128).sum();
    if total == 0 {
        return Some(candidates[rng.gen_range(0..candidates.len())]);
    }

    let mut point = rng.gen_range(0..total);
    for &candidate in candidates {
        let weight = candidate.weight as u128;
        if point < weight {
            return Some(candidate);
        }
        point -= weight;
    }

    // Unreachable while point < total; keep the last entry as a floor
    candidates.last().copied()
}
