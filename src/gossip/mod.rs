//! Gossip-based cluster membership and shared-state store
//!
//! This module implements the node-local view of the cluster:
//! - Per-peer [`NodeInfo`] records with identity, generation, payload,
//!   liveness status, quorum membership, and failure domain
//! - Anti-entropy merge with last-writer-wins timestamps and locally
//!   authoritative statuses ([`GossipStore::update`])
//! - A failure-domain index and the cluster reconciler
//!   ([`GossipStore::update_cluster`])
//! - Quorum evaluation with failure-domain policies and loss debouncing
//!   ([`QuorumEvaluator`])
//! - The delegate the membership transport drives
//!   ([`MembershipDelegate`])

pub mod config;
pub mod domains;
pub mod quorum;
pub mod store;
pub mod transport;
pub mod types;
pub mod value;
pub mod wire;

use thiserror::Error;

// Re-export main types
pub use config::{ConfigError, GossipConfig};
pub use domains::FailureDomainIndex;
pub use quorum::{FailureDomainPolicy, QuorumDecision, QuorumEvaluator, QuorumView};
pub use store::{GossipStore, StoreError, StoreResult};
pub use transport::MembershipDelegate;
pub use types::{
    now_ts, ClusterDomainsQuorumMembersMap, NodeId, NodeInfo, NodeInfoMap, NodeMetaInfo,
    NodeStatus, NodeUpdate, NodeValue, NodeValueMap, StoreKey, Timestamp, INVALID_GEN_NUMBER,
};
pub use value::{StoreValue, ValueMap};
pub use wire::{WireError, WireResult};

/// Umbrella error for callers driving the store through the transport
#[derive(Error, Debug, PartialEq)]
pub enum GossipError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

pub type GossipResult<T> = Result<T, GossipError>;
