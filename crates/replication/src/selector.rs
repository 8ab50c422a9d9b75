//! Group selection.
//!
//! Turns a key, an object size and a replication requirement into the
//! ordered list of groups an operation targets.
//!
//! # Algorithm
//!
//! 1. A non-empty explicit group list from the caller wins, verbatim
//! 2. Otherwise ask the weight cache for a replica set of the right size class
//! 3. If the cache has nothing (uninitialized, balancer disabled, empty
//!    class), use the statically configured groups
//! 4. Refuse to under-replicate: fewer groups than `min_groups` is an error
//!
//! Selection is a pure function of its inputs. It never retries and never
//! touches cache state, so it is testable without a balancer.

use std::sync::Arc;

use corelib::{GroupId, Key};
use tracing::debug;

use crate::cache::WeightCache;
use crate::error::{ReplicationError, Result};

/// Per-operation selection input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionRequest {
    pub key: Key,
    /// Object size in bytes, used to pick the size class.
    pub requested_size: u64,
    /// Replication requirement; 0 means no requirement.
    pub min_groups: usize,
    /// Caller-supplied override.
    pub explicit_groups: Vec<GroupId>,
}

impl SelectionRequest {
    pub fn new(key: impl Into<Key>, requested_size: u64) -> Self {
        Self {
            key: key.into(),
            requested_size,
            ..Self::default()
        }
    }

    pub fn with_min_groups(mut self, min_groups: usize) -> Self {
        self.min_groups = min_groups;
        self
    }

    pub fn with_explicit_groups(mut self, groups: Vec<GroupId>) -> Self {
        self.explicit_groups = groups;
        self
    }
}

/// Resolve the target groups for `request`.
///
/// # Arguments
/// * `request` - key, size and replication requirement
/// * `cache` - weight cache to consult, `None` when the balancer is disabled
/// * `static_groups` - operator-configured fallback
/// * `explicit_groups` - override; takes precedence over `request.explicit_groups`
///
/// # Errors
/// - [`ReplicationError::NoViableGroups`] when nothing resolves
/// - [`ReplicationError::InsufficientGroups`] when the weighted or static
///   resolution is shorter than `request.min_groups`
pub fn select_groups<C: WeightCache + ?Sized>(
    request: &SelectionRequest,
    cache: Option<&C>,
    static_groups: &[GroupId],
    explicit_groups: &[GroupId],
) -> Result<Vec<GroupId>> {
    let explicit = if explicit_groups.is_empty() {
        &request.explicit_groups[..]
    } else {
        explicit_groups
    };
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }

    let (groups, source) = match cache.and_then(|c| c.choose(request.requested_size)) {
        Some(chosen) => (chosen.group_ids, "balancer"),
        None => (static_groups.to_vec(), "static"),
    };

    if groups.is_empty() {
        return Err(ReplicationError::NoViableGroups);
    }
    if groups.len() < request.min_groups {
        return Err(ReplicationError::InsufficientGroups {
            needed: request.min_groups,
            got: groups.len(),
        });
    }

    debug!(
        key = %request.key.id(),
        size = request.requested_size,
        source,
        groups = ?groups,
        "selected groups"
    );
    Ok(groups)
}

/// Selection bound to one proxy's static configuration and cache.
#[derive(Debug, Clone)]
pub struct GroupSelector<C> {
    static_groups: Vec<GroupId>,
    cache: Option<Arc<C>>,
    balancer_enabled: bool,
}

impl<C: WeightCache> GroupSelector<C> {
    /// Selector with only static groups.
    pub fn new(static_groups: Vec<GroupId>) -> Self {
        Self {
            static_groups,
            cache: None,
            balancer_enabled: false,
        }
    }

    /// Attach a weight cache and enable balancer-driven selection.
    pub fn with_cache(mut self, cache: Arc<C>) -> Self {
        self.cache = Some(cache);
        self.balancer_enabled = true;
        self
    }

    /// Toggle use of the attached cache without detaching it.
    pub fn with_balancer_enabled(mut self, enabled: bool) -> Self {
        self.balancer_enabled = enabled;
        self
    }

    pub fn static_groups(&self) -> &[GroupId] {
        &self.static_groups
    }

    /// The cache, if one is attached and the balancer is enabled.
    pub fn cache(&self) -> Option<&C> {
        if self.balancer_enabled {
            self.cache.as_deref()
        } else {
            None
        }
    }

    pub fn select(&self, request: &SelectionRequest) -> Result<Vec<GroupId>> {
        select_groups(request, self.cache(), &self.static_groups, &[])
    }
}
