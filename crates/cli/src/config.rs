//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use replication::ProxyConfig;

use crate::commands::{self, Command};

#[derive(Debug, Parser)]
#[command(name = "groupctl", version, about = "Inspect balancer-driven group placement")]
pub struct CliConfig {
    /// Proxy configuration file (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the balancer address from the configuration file
    #[arg(long, global = true)]
    pub balancer: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load the proxy configuration, applying command-line overrides.
    pub fn proxy_config(&self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ProxyConfig::default(),
        };
        if let Some(addr) = &self.balancer {
            config.balancer.address = Some(addr.clone());
            config.balancer.enabled = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// Execute the selected command on a fresh runtime and print its result.
    pub fn run(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        let result = runtime.block_on(commands::execute(&self))?;
        println!("{}", result);
        Ok(())
    }
}
