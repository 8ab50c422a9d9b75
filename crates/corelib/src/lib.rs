//! Core library for balancer-driven group placement.
//!
//! This crate provides the fundamental value types shared by the workspace:
//! - Storage group identifiers and group list parsing
//! - Object keys and their stable digests
//! - Weight snapshots published by the balancer, with their invariants
//! - The shared error type

pub mod error;
pub mod group;
pub mod key;
pub mod weights;

pub use error::{Error, Result};
pub use group::GroupId;
pub use key::{Key, KeyId};
pub use weights::{GroupSetWeight, SizeClassWeights, WeightSnapshot};
