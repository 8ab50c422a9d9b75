//! Storage group identifiers.
//!
//! A group is a replica set inside the storage cluster that can serve an
//! object on its own. Groups are addressed by small signed integers, the same
//! numbering the storage nodes and the balancer use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compact identifier for a storage group.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for GroupId {
    fn from(id: i32) -> Self {
        GroupId(id)
    }
}

impl FromStr for GroupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i32>()
            .map(GroupId)
            .map_err(|e| Error::InvalidGroup(format!("{:?}: {}", s, e)))
    }
}

/// Builds a group list from raw integers, preserving order.
pub fn groups(ids: &[i32]) -> Vec<GroupId> {
    ids.iter().copied().map(GroupId).collect()
}

/// Parses a `:`- or `,`-separated group list such as `"1:2:3"`.
///
/// Empty input yields an empty list.
pub fn parse_group_list(s: &str) -> Result<Vec<GroupId>> {
    s.split(|c: char| c == ':' || c == ',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(GroupId::from_str)
        .collect()
}

/// Formats groups the way operators write them (`1:2:3`).
pub fn format_group_list(groups: &[GroupId]) -> String {
    groups
        .iter()
        .map(GroupId::to_string)
        .collect::<Vec<_>>()
        .join(":")
}
