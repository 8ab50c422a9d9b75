//! Balancer wire messages.
//!
//! Every exchange is one request frame followed by one response frame on a
//! fresh connection. Weight requests carry a stamp which the balancer echoes
//! back, so a late answer to an older request can be told apart from the
//! answer to the current one.

use corelib::{GroupId, GroupSetWeight, SizeClassWeights, WeightSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Ask for the current per-size-class weights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWeightsRequest {
    pub stamp: u64,
}

/// Replica set with its weight, as sent by the balancer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithWeight {
    pub group_ids: Vec<i32>,
    pub weight: u64,
}

/// All replica sets of one size class, as sent by the balancer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedGroups {
    pub size: u64,
    pub weighted_groups: Vec<GroupWithWeight>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWeightsResponse {
    /// Echo of the request stamp.
    pub stamp: u64,
    pub info: Vec<SizedGroups>,
}

impl GroupWeightsResponse {
    /// Convert the wire shape into a validated snapshot.
    ///
    /// Size classes are sorted by threshold first; duplicate thresholds are
    /// still rejected by snapshot validation.
    ///
    /// # Errors
    /// [`BalancerError::InvalidSnapshot`](crate::BalancerError::InvalidSnapshot)
    /// if the balancer sent something that is not a well-formed snapshot
    pub fn into_snapshot(self) -> Result<WeightSnapshot> {
        let mut classes: Vec<SizeClassWeights> = self
            .info
            .into_iter()
            .map(|sized| {
                let entries = sized
                    .weighted_groups
                    .into_iter()
                    .map(|g| {
                        GroupSetWeight::new(
                            g.group_ids.into_iter().map(GroupId).collect(),
                            g.weight,
                        )
                    })
                    .collect();
                SizeClassWeights::new(sized.size, entries)
            })
            .collect();
        classes.sort_by_key(|c| c.size_threshold);
        Ok(WeightSnapshot::new(classes)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfoRequest {
    pub group: GroupId,
}

/// Health of a group as seen by the balancer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    Ok,
    Bad,
    Coupled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfoResponse {
    /// Storage node addresses serving the group.
    pub nodes: Vec<String>,
    /// Groups coupled with this one into a replica set.
    pub couples: Vec<GroupId>,
    pub status: GroupStatus,
}

/// Envelope for everything that travels over a balancer connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    GroupWeightsRequest(GroupWeightsRequest),
    GroupWeightsResponse(GroupWeightsResponse),
    GroupInfoRequest(GroupInfoRequest),
    GroupInfoResponse(GroupInfoResponse),
}

/// Discriminant of a [`Message`], for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    GroupWeightsRequest,
    GroupWeightsResponse,
    GroupInfoRequest,
    GroupInfoResponse,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::GroupWeightsRequest(_) => MessageType::GroupWeightsRequest,
            Message::GroupWeightsResponse(_) => MessageType::GroupWeightsResponse,
            Message::GroupInfoRequest(_) => MessageType::GroupInfoRequest,
            Message::GroupInfoResponse(_) => MessageType::GroupInfoResponse,
        }
    }
}
