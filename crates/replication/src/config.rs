//! Proxy configuration consumed by group selection.

use std::path::Path;
use std::time::Duration;

use corelib::GroupId;
use serde::{Deserialize, Serialize};

use crate::error::{ReplicationError, Result};
use crate::quorum::QuorumSpec;
use crate::refresh::RefreshConfig;

/// Static configuration of the selection core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Fallback groups used whenever the balancer has nothing to offer.
    pub groups: Vec<GroupId>,
    /// Default replication requirement for writes; 0 means none.
    pub replication_count: usize,
    /// Success-copies policy in its integer encoding (-1 any, -2 quorum,
    /// -3 all, n > 0 exact).
    pub success_copies_num: i32,
    pub balancer: BalancerConfig,
}

/// Balancer connection and refresh settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub enabled: bool,
    /// `host:port` of the balancer.
    pub address: Option<String>,
    pub refresh_period_secs: u64,
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            replication_count: 0,
            success_copies_num: QuorumSpec::QUORUM_CODE,
            balancer: BalancerConfig::default(),
        }
    }
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: None,
            refresh_period_secs: 60,
            timeout_ms: 1000,
        }
    }
}

impl ProxyConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProxyConfig = serde_json::from_str(json)
            .map_err(|e| ReplicationError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReplicationError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.quorum()?;

        if self.balancer.enabled && self.balancer.address.as_deref().map_or(true, str::is_empty) {
            return Err(ReplicationError::Config(
                "balancer.enabled requires balancer.address".into(),
            ));
        }

        // Checked regardless of `enabled`: an address alone can still be polled
        if self.balancer.refresh_period_secs == 0 {
            return Err(ReplicationError::Config(
                "balancer.refresh_period_secs must be positive".into(),
            ));
        }
        if self.balancer.timeout_ms == 0 {
            return Err(ReplicationError::Config(
                "balancer.timeout_ms must be positive".into(),
            ));
        }

        // Without a balancer the static groups are the only source
        if !self.balancer.enabled && self.replication_count > self.groups.len() {
            return Err(ReplicationError::Config(format!(
                "replication_count {} exceeds the {} static groups",
                self.replication_count,
                self.groups.len()
            )));
        }

        Ok(())
    }

    pub fn quorum(&self) -> Result<QuorumSpec> {
        Ok(QuorumSpec::from_success_copies(self.success_copies_num)?)
    }

    /// Refresh timing. Non-zero once [`ProxyConfig::validate`] has passed.
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            period: Duration::from_secs(self.balancer.refresh_period_secs),
            timeout: Duration::from_millis(self.balancer.timeout_ms),
        }
    }
}
