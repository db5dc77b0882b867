//! Gossipmesh
//!
//! Gossip-based cluster membership and shared state for distributed
//! storage clusters. Each node keeps an in-memory view of every peer and
//! reconciles it three ways: anti-entropy merges of remote snapshots,
//! membership events from the failure-detection transport, and an
//! authoritative peer list from the configuration store.
//!
//! The crate deliberately stops at the store boundary: failure detection,
//! the management REST surface, persistence, and authentication belong to
//! the owning daemon.
//!
//! # Example
//!
//! ```rust
//! use gossipmesh::{GossipConfig, GossipStore, StoreKey};
//!
//! let config = GossipConfig::new("node-0", "v1", "prod-cluster", "rack-a");
//! let store = GossipStore::new(config).unwrap();
//!
//! // Publish a value; peers pick it up on the next gossip round.
//! store.update_self(StoreKey::new("capacity"), 512i64.into());
//!
//! let keys = store.get_store_keys();
//! assert!(keys.contains(&StoreKey::new("capacity")));
//! ```

#![warn(clippy::all)]

pub mod gossip;

// Re-export main types for convenience
pub use gossip::{
    now_ts, ClusterDomainsQuorumMembersMap, ConfigError, FailureDomainIndex, FailureDomainPolicy,
    GossipConfig, GossipError, GossipResult, GossipStore, MembershipDelegate, NodeId, NodeInfo,
    NodeInfoMap, NodeMetaInfo, NodeStatus, NodeUpdate, NodeValue, NodeValueMap, QuorumDecision,
    QuorumEvaluator, QuorumView, StoreError, StoreKey, StoreResult, StoreValue, Timestamp,
    ValueMap, WireError, WireResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
