//! Weight cache abstractions.
//!
//! The weight cache holds the last snapshot fetched from the balancer and
//! answers "which replica set should this object go to" without ever touching
//! the network. Request workers read it concurrently; the refresh loop is the
//! only writer.
//!
//! - **BalancedWeightCache**: lock-free reads over an atomically swapped snapshot

pub mod weighted;

use std::sync::Arc;

use corelib::{GroupSetWeight, WeightSnapshot};

pub use weighted::BalancedWeightCache;

/// Trait for group weight caches.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync): `choose` is called from
/// every request worker while `update` runs on the refresh task.
pub trait WeightCache: Send + Sync + 'static {
    /// Publish `snapshot` if `stamp` is newer than the published stamp.
    ///
    /// An equal stamp is a retry of the refresh that already published: it is
    /// acknowledged and the published snapshot stays as it is.
    ///
    /// # Returns
    /// `true` if the stamp was accepted, `false` if it was rejected
    fn update(&self, snapshot: WeightSnapshot, stamp: u64) -> bool;

    /// Pick a replica set for an object of `requested_size` bytes.
    ///
    /// # Returns
    /// `None` before the first successful update or when the matching size
    /// class has no entries; callers fall back to static groups
    ///
    /// # Performance
    /// In-memory only, never blocks
    fn choose(&self, requested_size: u64) -> Option<GroupSetWeight>;

    /// True once any update has succeeded. Never goes back to false.
    fn initialized(&self) -> bool;

    /// Stamp of the published snapshot.
    fn stamp(&self) -> Option<u64>;

    /// Point-in-time view of the published snapshot.
    fn snapshot(&self) -> Option<Arc<WeightSnapshot>>;
}

impl<T: WeightCache + ?Sized> WeightCache for Arc<T> {
    fn update(&self, snapshot: WeightSnapshot, stamp: u64) -> bool {
        (**self).update(snapshot, stamp)
    }

    fn choose(&self, requested_size: u64) -> Option<GroupSetWeight> {
        (**self).choose(requested_size)
    }

    fn initialized(&self) -> bool {
        (**self).initialized()
    }

    fn stamp(&self) -> Option<u64> {
        (**self).stamp()
    }

    fn snapshot(&self) -> Option<Arc<WeightSnapshot>> {
        (**self).snapshot()
    }
}
