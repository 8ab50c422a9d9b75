//! Tests for the refresh loop against a scripted balancer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use balancer::{
    BalancerClient, BalancerError, GroupInfoResponse, GroupStatus, GroupWeightsResponse,
    GroupWithWeight, SizedGroups,
};
use corelib::group::groups;
use corelib::GroupId;
use parking_lot::Mutex;
use replication::cache::{BalancedWeightCache, WeightCache};
use replication::{RefreshConfig, RefreshLoop, ReplicationError};

/// What the fake balancer does with the next request.
enum Script {
    Serve(Vec<i32>),
    Fail,
    Hang,
    WrongStamp,
    Malformed,
}

#[derive(Default)]
struct ScriptedBalancer {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<u64>>,
}

impl ScriptedBalancer {
    fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<u64> {
        self.requests.lock().clone()
    }
}

fn response(stamp: u64, ids: Vec<i32>) -> GroupWeightsResponse {
    GroupWeightsResponse {
        stamp,
        info: vec![SizedGroups {
            size: 1_048_576,
            weighted_groups: vec![GroupWithWeight {
                group_ids: ids,
                weight: 100,
            }],
        }],
    }
}

#[async_trait]
impl BalancerClient for ScriptedBalancer {
    async fn group_weights(&self, stamp: u64) -> balancer::Result<GroupWeightsResponse> {
        self.requests.lock().push(stamp);
        let next = self.script.lock().pop_front().unwrap_or(Script::Fail);
        match next {
            Script::Serve(ids) => Ok(response(stamp, ids)),
            Script::Fail => Err(BalancerError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ))),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(response(stamp, vec![99]))
            }
            Script::WrongStamp => Ok(response(stamp + 100, vec![98])),
            Script::Malformed => Ok(GroupWeightsResponse {
                stamp,
                info: vec![],
            }),
        }
    }

    async fn group_info(&self, group: GroupId) -> balancer::Result<GroupInfoResponse> {
        Ok(GroupInfoResponse {
            nodes: vec![],
            couples: vec![group],
            status: GroupStatus::Ok,
        })
    }
}

fn fast() -> RefreshConfig {
    RefreshConfig {
        period: Duration::from_millis(20),
        timeout: Duration::from_millis(50),
    }
}

#[test]
fn test_zero_timing_rejected() {
    let client = ScriptedBalancer::new(vec![]);
    let cache = Arc::new(BalancedWeightCache::new());

    let zero_period = RefreshConfig {
        period: Duration::ZERO,
        ..fast()
    };
    let err = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), zero_period).err();
    assert!(matches!(err, Some(ReplicationError::Config(_))));

    let zero_timeout = RefreshConfig {
        timeout: Duration::ZERO,
        ..fast()
    };
    let err = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), zero_timeout).err();
    assert!(matches!(err, Some(ReplicationError::Config(_))));
}

#[tokio::test]
async fn test_refresh_once_populates_cache() {
    let client = ScriptedBalancer::new(vec![Script::Serve(vec![4, 5])]);
    let cache = Arc::new(BalancedWeightCache::new());
    let refresh = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast()).unwrap();

    let stamp = refresh.refresh_once().await.unwrap();
    assert_eq!(stamp, 1);
    assert!(cache.initialized());
    assert_eq!(cache.choose(2048).unwrap().group_ids, groups(&[4, 5]));
}

#[tokio::test]
async fn test_failures_keep_last_known_good() {
    let client = ScriptedBalancer::new(vec![
        Script::Serve(vec![1, 2]),
        Script::Fail,
        Script::WrongStamp,
        Script::Malformed,
        Script::Hang,
    ]);
    let cache = Arc::new(BalancedWeightCache::new());
    let refresh = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast()).unwrap();

    refresh.refresh_once().await.unwrap();
    for _ in 0..4 {
        let err = refresh.refresh_once().await.unwrap_err();
        assert!(matches!(err, ReplicationError::BalancerUnavailable(_)));
        assert_eq!(cache.stamp(), Some(1));
        assert_eq!(cache.choose(1).unwrap().group_ids, groups(&[1, 2]));
    }

    // Every cycle used a fresh stamp
    assert_eq!(client.requests(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_stamps_continue_after_cache() {
    let cache = Arc::new(BalancedWeightCache::new());
    let seed = response(10, vec![7]).into_snapshot().unwrap();
    assert!(cache.update(seed, 10));

    let client = ScriptedBalancer::new(vec![Script::Serve(vec![8])]);
    let refresh = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast()).unwrap();
    assert_eq!(refresh.refresh_once().await.unwrap(), 11);
    assert_eq!(cache.choose(1).unwrap().group_ids, groups(&[8]));
}

#[tokio::test]
async fn test_spawned_loop_refreshes_and_stops() {
    let client = ScriptedBalancer::new(vec![
        Script::Fail,
        Script::Serve(vec![3, 4]),
        Script::Serve(vec![5, 6]),
    ]);
    let cache = Arc::new(BalancedWeightCache::new());
    let handle = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast())
        .unwrap()
        .spawn();

    let mut waited = Duration::ZERO;
    while cache.stamp() != Some(3) && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(cache.choose(1).unwrap().group_ids, groups(&[5, 6]));

    tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .expect("refresh loop did not stop");
}

#[tokio::test]
async fn test_subscribers_see_published_stamps() {
    let client = ScriptedBalancer::new(vec![
        Script::Serve(vec![1]),
        Script::Fail,
        Script::Serve(vec![2]),
    ]);
    let cache = Arc::new(BalancedWeightCache::new());
    let refresh = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast()).unwrap();
    let mut published = refresh.subscribe();
    assert_eq!(*published.borrow(), None);

    let handle = refresh.spawn();
    let mut seen = Vec::new();
    while seen.last() != Some(&3) {
        tokio::time::timeout(Duration::from_secs(5), published.changed())
            .await
            .expect("no snapshot published")
            .unwrap();
        if let Some(stamp) = *published.borrow_and_update() {
            seen.push(stamp);
        }
    }
    // The failed cycle with stamp 2 is never announced
    assert!(!seen.contains(&2));
    assert_eq!(cache.choose(1).unwrap().group_ids, groups(&[2]));

    handle.shutdown().await;
    assert!(published.changed().await.is_err());
}

#[tokio::test]
async fn test_shutdown_during_hung_call() {
    let client = ScriptedBalancer::new(vec![Script::Hang]);
    let cache = Arc::new(BalancedWeightCache::new());
    let handle = RefreshLoop::new(Arc::clone(&client), Arc::clone(&cache), fast())
        .unwrap()
        .spawn();

    tokio::time::sleep(Duration::from_millis(10)).await;
    // Bounded by the call timeout, not by the hung balancer
    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("refresh loop waited on a hung balancer");
    assert!(!cache.initialized());
}
