//! Per-operation group routing.
//!
//! `GroupRouter` is what the request layer talks to. It binds the static
//! configuration, the weight cache and the success-copies policy, and answers
//! "which groups" for every kind of storage operation:
//!
//! - **write**: weighted selection by object size, replication enforced
//! - **read / remove / lookup**: explicit or static groups; weights only
//!   govern where new data goes, not where existing data lives
//! - **balancer groups**: the raw balancer choice, no static fallback

use std::sync::Arc;

use corelib::{GroupId, Key};
use tracing::debug;

use crate::cache::WeightCache;
use crate::config::ProxyConfig;
use crate::error::{ReplicationError, Result};
use crate::quorum::{GroupOutcome, QuorumReport, QuorumSpec};
use crate::selector::{GroupSelector, SelectionRequest};

#[derive(Debug)]
pub struct GroupRouter<C> {
    config: ProxyConfig,
    selector: GroupSelector<C>,
    quorum: QuorumSpec,
}

impl<C: WeightCache> GroupRouter<C> {
    /// Build a router; `cache` is only consulted when the balancer is enabled.
    pub fn new(config: ProxyConfig, cache: Option<Arc<C>>) -> Result<Self> {
        config.validate()?;
        let quorum = config.quorum()?;

        let mut selector = GroupSelector::new(config.groups.clone());
        if let Some(cache) = cache {
            selector = selector
                .with_cache(cache)
                .with_balancer_enabled(config.balancer.enabled);
        }

        Ok(Self {
            config,
            selector,
            quorum,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Default success-copies policy.
    pub fn quorum(&self) -> QuorumSpec {
        self.quorum
    }

    /// Groups for a new object of `size` bytes.
    ///
    /// `replication_count` of 0 falls back to the configured default.
    pub fn write_groups(
        &self,
        key: &Key,
        size: u64,
        explicit: &[GroupId],
        replication_count: usize,
    ) -> Result<Vec<GroupId>> {
        let min_groups = if replication_count > 0 {
            replication_count
        } else {
            self.config.replication_count
        };
        let request = SelectionRequest {
            key: key.clone(),
            requested_size: size,
            min_groups,
            explicit_groups: explicit.to_vec(),
        };
        self.selector.select(&request)
    }

    pub fn read_groups(&self, key: &Key, explicit: &[GroupId]) -> Result<Vec<GroupId>> {
        self.existing_object_groups("read", key, explicit)
    }

    pub fn remove_groups(&self, key: &Key, explicit: &[GroupId]) -> Result<Vec<GroupId>> {
        self.existing_object_groups("remove", key, explicit)
    }

    pub fn lookup_groups(&self, key: &Key, explicit: &[GroupId]) -> Result<Vec<GroupId>> {
        self.existing_object_groups("lookup", key, explicit)
    }

    fn existing_object_groups(
        &self,
        op: &'static str,
        key: &Key,
        explicit: &[GroupId],
    ) -> Result<Vec<GroupId>> {
        let groups = if explicit.is_empty() {
            self.selector.static_groups().to_vec()
        } else {
            explicit.to_vec()
        };
        if groups.is_empty() {
            return Err(ReplicationError::NoViableGroups);
        }
        debug!(op, key = %key.id(), groups = ?groups, "resolved groups");
        Ok(groups)
    }

    /// Replica set the balancer currently prefers for `size`, with at least
    /// `count` groups (0 = any size).
    ///
    /// Unlike [`write_groups`](Self::write_groups) this never falls back to
    /// static groups.
    pub fn balancer_groups(&self, count: usize, size: u64, key: &Key) -> Result<Vec<GroupId>> {
        let cache = self.selector.cache().ok_or_else(|| {
            ReplicationError::BalancerUnavailable("balancer is disabled".into())
        })?;
        if !cache.initialized() {
            return Err(ReplicationError::BalancerUnavailable(
                "weight cache is not initialized yet".into(),
            ));
        }

        let chosen = cache.choose(size).ok_or(ReplicationError::NoViableGroups)?;
        if chosen.group_ids.len() < count {
            return Err(ReplicationError::InsufficientGroups {
                needed: count,
                got: chosen.group_ids.len(),
            });
        }
        debug!(key = %key.id(), size, groups = ?chosen.group_ids, "balancer groups");
        Ok(chosen.group_ids)
    }

    /// Evaluate per-group write outcomes against the default policy or
    /// `override_spec`.
    pub fn acknowledge_write(
        &self,
        outcomes: Vec<GroupOutcome>,
        override_spec: Option<QuorumSpec>,
    ) -> Result<QuorumReport> {
        override_spec.unwrap_or(self.quorum).evaluate(outcomes)
    }
}
