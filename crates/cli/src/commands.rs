//! Command implementations.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use balancer::{BalancerClient, GroupInfoResponse, TcpBalancerClient};
use clap::Subcommand;
use corelib::group::{format_group_list, parse_group_list};
use corelib::{GroupId, Key, WeightSnapshot};
use replication::{
    BalancedWeightCache, GroupOutcome, GroupRouter, ProxyConfig, QuorumReport, QuorumSpec,
    RefreshLoop, ReplicationError, WeightCache,
};
use tracing::{info, warn};

use crate::config::CliConfig;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the groups a write of KEY would target
    Select {
        key: String,
        /// Object size in bytes
        #[arg(long, default_value_t = 0)]
        size: u64,
        /// Replication requirement (0 = configured default)
        #[arg(long, default_value_t = 0)]
        replicas: usize,
        /// Explicit groups, e.g. `1:2:3`
        #[arg(long)]
        groups: Option<String>,
    },
    /// Evaluate a success-copies policy against write outcomes
    Quorum {
        /// `any`, `quorum`, `all` or a copy count (configured policy if omitted)
        #[arg(long)]
        policy: Option<String>,
        /// Per-group outcomes in selection order, e.g. `1:ok,2:fail,3:ok`
        outcomes: String,
    },
    /// Poll the balancer and print every published snapshot
    Watch {
        /// Stop after this many successful refreshes
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Ask the balancer about one group
    GroupInfo { group: i32 },
}

/// Printable outcome of a command.
#[derive(Debug)]
pub enum CommandResult {
    Groups(Vec<GroupId>),
    Quorum(Result<QuorumReport, ReplicationError>),
    Watched { refreshes: usize },
    GroupInfo(GroupInfoResponse),
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Groups(groups) => write!(f, "{}", format_group_list(groups)),
            CommandResult::Quorum(Ok(report)) => write!(
                f,
                "ok: {} of {} succeeded ({} required by {})",
                report.succeeded(),
                report.total(),
                report.required,
                report.spec
            ),
            CommandResult::Quorum(Err(ReplicationError::QuorumNotMet { report })) => write!(
                f,
                "failed: {} of {} succeeded ({} required by {}), retry {}",
                report.succeeded(),
                report.total(),
                report.required,
                report.spec,
                format_group_list(&report.failed_groups())
            ),
            CommandResult::Quorum(Err(e)) => write!(f, "error: {}", e),
            CommandResult::Watched { refreshes } => write!(f, "{} refreshes", refreshes),
            CommandResult::GroupInfo(info) => write!(
                f,
                "status: {:?}\ncouples: {}\nnodes: {}",
                info.status,
                format_group_list(&info.couples),
                info.nodes.join(", ")
            ),
        }
    }
}

pub async fn execute(cli: &CliConfig) -> anyhow::Result<CommandResult> {
    let config = cli.proxy_config()?;
    match &cli.command {
        Command::Select {
            key,
            size,
            replicas,
            groups,
        } => select(config, key, *size, *replicas, groups.as_deref()).await,
        Command::Quorum { policy, outcomes } => quorum(&config, policy.as_deref(), outcomes),
        Command::Watch { cycles } => watch(&config, *cycles).await,
        Command::GroupInfo { group } => {
            let client = balancer_client(&config)?;
            let info = client.group_info(GroupId(*group)).await?;
            Ok(CommandResult::GroupInfo(info))
        }
    }
}

fn balancer_client(config: &ProxyConfig) -> anyhow::Result<Arc<TcpBalancerClient>> {
    let addr = config
        .balancer
        .address
        .as_deref()
        .ok_or_else(|| anyhow!("no balancer address configured"))?;
    Ok(Arc::new(TcpBalancerClient::new(addr)))
}

/// Resolve write groups, refreshing the cache once if a balancer is configured.
async fn select(
    config: ProxyConfig,
    key: &str,
    size: u64,
    replicas: usize,
    explicit: Option<&str>,
) -> anyhow::Result<CommandResult> {
    let explicit = match explicit {
        Some(s) => parse_group_list(s)?,
        None => Vec::new(),
    };

    let cache = Arc::new(BalancedWeightCache::new());
    if config.balancer.enabled {
        let refresh = RefreshLoop::new(
            balancer_client(&config)?,
            Arc::clone(&cache),
            config.refresh_config(),
        )?;
        if let Err(e) = refresh.refresh_once().await {
            warn!(error = %e, "balancer refresh failed, using static groups");
        }
    }

    let router = GroupRouter::new(config, Some(cache))?;
    let groups = router.write_groups(&Key::from(key), size, &explicit, replicas)?;
    Ok(CommandResult::Groups(groups))
}

fn quorum(
    config: &ProxyConfig,
    policy: Option<&str>,
    outcomes: &str,
) -> anyhow::Result<CommandResult> {
    let spec = match policy {
        Some(p) => p.parse::<QuorumSpec>()?,
        None => config.quorum()?,
    };
    let outcomes = parse_outcomes(outcomes)?;
    Ok(CommandResult::Quorum(spec.evaluate(outcomes)))
}

/// Parse `1:ok,2:fail` into outcomes.
fn parse_outcomes(s: &str) -> anyhow::Result<Vec<GroupOutcome>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (group, status) = part
                .split_once(':')
                .with_context(|| format!("expected GROUP:ok|fail, got {:?}", part))?;
            let group: GroupId = group.parse()?;
            match status.trim() {
                "ok" => Ok(GroupOutcome::success(group)),
                "fail" => Ok(GroupOutcome::failure(group, "reported failed")),
                other => bail!("unknown outcome {:?} for group {}", other, group),
            }
        })
        .collect()
}

async fn watch(config: &ProxyConfig, cycles: Option<usize>) -> anyhow::Result<CommandResult> {
    let cache = Arc::new(BalancedWeightCache::new());
    let refresh = RefreshLoop::new(
        balancer_client(config)?,
        Arc::clone(&cache),
        config.refresh_config(),
    )?;
    let mut published = refresh.subscribe();
    let handle = refresh.spawn();

    let mut refreshes = 0;
    loop {
        tokio::select! {
            changed = published.changed() => {
                if changed.is_err() {
                    warn!("refresh loop exited");
                    break;
                }
                let stamp = *published.borrow_and_update();
                if let (Some(stamp), Some(snapshot)) = (stamp, cache.snapshot()) {
                    refreshes += 1;
                    match render_snapshot(stamp, &snapshot) {
                        Ok(text) => println!("{}", text),
                        Err(e) => warn!(error = %e, stamp, "cannot render snapshot"),
                    }
                }
                if cycles.map_or(false, |limit| refreshes >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(CommandResult::Watched { refreshes })
}

fn render_snapshot(stamp: u64, snapshot: &WeightSnapshot) -> anyhow::Result<String> {
    let body = serde_json::to_string_pretty(snapshot)?;
    Ok(format!("stamp {}:\n{}", stamp, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::group::groups;

    #[test]
    fn test_parse_outcomes() {
        let outcomes = parse_outcomes("1:ok, 2:fail,3:ok").unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[2].group, GroupId(3));
    }

    #[test]
    fn test_parse_outcomes_rejects_garbage() {
        assert!(parse_outcomes("1").is_err());
        assert!(parse_outcomes("1:maybe").is_err());
        assert!(parse_outcomes("x:ok").is_err());
    }

    #[test]
    fn test_quorum_command_reports_failures() {
        let config = ProxyConfig::default();
        let result = quorum(&config, Some("all"), "1:ok,2:fail,3:ok").unwrap();
        assert_eq!(
            result.to_string(),
            "failed: 2 of 3 succeeded (3 required by all), retry 2"
        );

        let result = quorum(&config, None, "1:ok,2:fail,3:ok").unwrap();
        assert_eq!(result.to_string(), "ok: 2 of 3 succeeded (2 required by quorum)");
    }

    #[test]
    fn test_quorum_command_config_error() {
        let result = quorum(&ProxyConfig::default(), Some("5"), "1:ok,2:ok,3:ok").unwrap();
        assert!(result.to_string().starts_with("error: quorum requires 5 copies"));
    }

    #[tokio::test]
    async fn test_watch_prints_published_snapshots() {
        use balancer::codec::{read_message, write_message};
        use balancer::{GroupWeightsResponse, GroupWithWeight, Message, SizedGroups};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let stamp = match read_message(&mut socket).await.unwrap() {
                Message::GroupWeightsRequest(req) => req.stamp,
                other => panic!("unexpected request {:?}", other),
            };
            let response = Message::GroupWeightsResponse(GroupWeightsResponse {
                stamp,
                info: vec![SizedGroups {
                    size: 1024,
                    weighted_groups: vec![GroupWithWeight {
                        group_ids: vec![1, 2],
                        weight: 10,
                    }],
                }],
            });
            write_message(&mut socket, &response).await.unwrap();
        });

        let config = ProxyConfig::from_json(&format!(
            r#"{{"balancer": {{"address": "{}", "timeout_ms": 2000}}}}"#,
            addr
        ))
        .unwrap();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            watch(&config, Some(1)),
        )
        .await
        .expect("watch did not finish")
        .unwrap();
        assert_eq!(result.to_string(), "1 refreshes");
    }

    #[tokio::test]
    async fn test_select_with_static_groups() {
        let config = ProxyConfig::from_json(r#"{"groups": [1, 2, 3]}"#).unwrap();
        let result = select(config, "key", 1024, 0, None).await.unwrap();
        assert_eq!(result.to_string(), "1:2:3");
    }

    #[tokio::test]
    async fn test_select_with_explicit_groups() {
        let config = ProxyConfig::from_json(r#"{"groups": [1, 2, 3]}"#).unwrap();
        let result = select(config, "key", 1024, 0, Some("7:8")).await.unwrap();
        match result {
            CommandResult::Groups(g) => assert_eq!(g, groups(&[7, 8])),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
