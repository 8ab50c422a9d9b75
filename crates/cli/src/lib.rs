//! CLI tool for inspecting balancer-driven group placement.
//!
//! Provides commands for:
//! - Resolving the groups a write would target
//! - Evaluating success-copies policies against write outcomes
//! - Watching the balancer's published weights
//! - Querying group info from the balancer

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
