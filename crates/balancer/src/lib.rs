//! Balancer protocol and client.
//!
//! This crate provides the pieces needed to talk to the external balancer:
//! - Request/response messages for group weights and group info
//! - Length-prefixed frame codec
//! - The `BalancerClient` seam and its TCP implementation

pub mod client;
pub mod codec;
pub mod error;
pub mod protocol;

pub use client::{BalancerClient, TcpBalancerClient};
pub use error::{BalancerError, Result};
pub use protocol::{
    GroupInfoRequest, GroupInfoResponse, GroupStatus, GroupWeightsRequest, GroupWeightsResponse,
    GroupWithWeight, Message, MessageType, SizedGroups,
};
