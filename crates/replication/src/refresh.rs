//! Background refresh of the weight cache.
//!
//! One task per proxy polls the balancer on a fixed period and feeds every
//! good answer into the cache. A failed or slow cycle is logged and skipped;
//! the previous snapshot stays authoritative until a later cycle succeeds.
//!
//! Stamps come from a counter rather than the clock, so request/response
//! correlation does not depend on clock skew between proxy and balancer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use balancer::BalancerClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::WeightCache;
use crate::error::{ReplicationError, Result};

/// Timing of the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Time between the starts of two cycles.
    pub period: Duration,
    /// Upper bound on one balancer call.
    pub timeout: Duration,
}

impl RefreshConfig {
    /// Both durations must be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(ReplicationError::Config(
                "refresh period must be positive".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ReplicationError::Config(
                "refresh timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Periodic balancer poller.
pub struct RefreshLoop<B, C> {
    client: Arc<B>,
    cache: Arc<C>,
    config: RefreshConfig,
    last_stamp: AtomicU64,
    published: watch::Sender<Option<u64>>,
}

impl<B: BalancerClient, C: WeightCache> RefreshLoop<B, C> {
    /// Stamps continue after whatever the cache already holds.
    ///
    /// # Errors
    /// [`ReplicationError::Config`] if the period or the timeout is zero
    pub fn new(client: Arc<B>, cache: Arc<C>, config: RefreshConfig) -> Result<Self> {
        config.validate()?;
        let current = cache.stamp();
        let (published, _) = watch::channel(current);
        Ok(Self {
            client,
            cache,
            config,
            last_stamp: AtomicU64::new(current.unwrap_or(0)),
            published,
        })
    }

    /// Stamp of the latest snapshot this loop published; seeded with the
    /// stamp the cache held at construction.
    ///
    /// The receiver closes once the loop is dropped.
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.published.subscribe()
    }

    fn next_stamp(&self) -> u64 {
        self.last_stamp.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run one cycle.
    ///
    /// # Returns
    /// The stamp of the snapshot that was published
    ///
    /// # Errors
    /// [`ReplicationError::BalancerUnavailable`] for transport failures,
    /// timeouts, stamp mismatches and malformed snapshots;
    /// [`ReplicationError::StaleUpdateRejected`] if the cache refused the stamp.
    pub async fn refresh_once(&self) -> Result<u64> {
        let stamp = self.next_stamp();

        let response = match timeout(self.config.timeout, self.client.group_weights(stamp)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ReplicationError::BalancerUnavailable(e.to_string())),
            Err(_) => {
                return Err(ReplicationError::BalancerUnavailable(format!(
                    "no answer within {:?}",
                    self.config.timeout
                )))
            }
        };

        if response.stamp != stamp {
            return Err(ReplicationError::BalancerUnavailable(format!(
                "response stamp {} does not match request stamp {}",
                response.stamp, stamp
            )));
        }

        let snapshot = response
            .into_snapshot()
            .map_err(|e| ReplicationError::BalancerUnavailable(e.to_string()))?;

        if !self.cache.update(snapshot, stamp) {
            return Err(ReplicationError::StaleUpdateRejected {
                stamp,
                current: self.cache.stamp().unwrap_or(0),
            });
        }
        self.published.send_replace(Some(stamp));
        Ok(stamp)
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first cycle runs immediately.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period = ?self.config.period, "weight refresh started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(stamp) => {
                            metrics::counter!("balancer_refresh_success_total").increment(1);
                            debug!(stamp, "weight cache refreshed");
                        }
                        Err(e) => {
                            metrics::counter!("balancer_refresh_failure_total").increment(1);
                            warn!(error = %e, "weight refresh failed, keeping previous snapshot");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("weight refresh stopped");
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> RefreshHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(Arc::new(self).run(rx));
        RefreshHandle { shutdown: tx, task }
    }
}

/// Owner of a running refresh task.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal the loop and wait for it to exit.
    ///
    /// A cycle in progress finishes first; it is bounded by the call timeout.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "weight refresh task ended abnormally");
        }
    }
}
