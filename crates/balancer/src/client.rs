//! Balancer client abstraction.
//!
//! The refresh loop only depends on the [`BalancerClient`] trait, so tests
//! can substitute an in-memory double while production uses
//! [`TcpBalancerClient`].

use std::sync::Arc;

use async_trait::async_trait;
use corelib::GroupId;
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::{read_message, write_message};
use crate::error::{BalancerError, Result};
use crate::protocol::{
    GroupInfoRequest, GroupInfoResponse, GroupWeightsRequest, GroupWeightsResponse, Message,
    MessageType,
};

/// Requests published data from the balancer.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync); one client is shared
/// between the refresh task and any diagnostic callers.
#[async_trait]
pub trait BalancerClient: Send + Sync + 'static {
    /// Fetch the weight snapshot for request `stamp`.
    ///
    /// The returned response carries the same stamp; implementations reject
    /// mismatches with [`BalancerError::StampMismatch`].
    async fn group_weights(&self, stamp: u64) -> Result<GroupWeightsResponse>;

    /// Fetch nodes, couples and status of a single group.
    async fn group_info(&self, group: GroupId) -> Result<GroupInfoResponse>;
}

#[async_trait]
impl<T: BalancerClient + ?Sized> BalancerClient for Arc<T> {
    async fn group_weights(&self, stamp: u64) -> Result<GroupWeightsResponse> {
        (**self).group_weights(stamp).await
    }

    async fn group_info(&self, group: GroupId) -> Result<GroupInfoResponse> {
        (**self).group_info(group).await
    }
}

/// Balancer client speaking the frame protocol over TCP.
///
/// Opens one connection per request. Timeouts are the caller's concern.
#[derive(Debug, Clone)]
pub struct TcpBalancerClient {
    addr: String,
}

impl TcpBalancerClient {
    /// Create a client for the balancer at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn round_trip(&self, request: &Message) -> Result<Message> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        write_message(&mut stream, request).await?;
        let response = read_message(&mut stream).await?;
        debug!(
            addr = %self.addr,
            request = ?request.message_type(),
            response = ?response.message_type(),
            "balancer round trip"
        );
        Ok(response)
    }
}

#[async_trait]
impl BalancerClient for TcpBalancerClient {
    async fn group_weights(&self, stamp: u64) -> Result<GroupWeightsResponse> {
        let request = Message::GroupWeightsRequest(GroupWeightsRequest { stamp });
        match self.round_trip(&request).await? {
            Message::GroupWeightsResponse(resp) if resp.stamp == stamp => Ok(resp),
            Message::GroupWeightsResponse(resp) => Err(BalancerError::StampMismatch {
                sent: stamp,
                received: resp.stamp,
            }),
            other => Err(BalancerError::UnexpectedMessage {
                expected: MessageType::GroupWeightsResponse,
                got: other.message_type(),
            }),
        }
    }

    async fn group_info(&self, group: GroupId) -> Result<GroupInfoResponse> {
        let request = Message::GroupInfoRequest(GroupInfoRequest { group });
        match self.round_trip(&request).await? {
            Message::GroupInfoResponse(resp) => Ok(resp),
            other => Err(BalancerError::UnexpectedMessage {
                expected: MessageType::GroupInfoResponse,
                got: other.message_type(),
            }),
        }
    }
}
