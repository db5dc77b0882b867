//! Core type definitions for the gossip membership store

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::value::{StoreValue, ValueMap};

/// Reserved generation number for a node whose generation has not yet
/// been observed
pub const INVALID_GEN_NUMBER: u64 = 0;

/// Wall-clock timestamp in microseconds since the Unix epoch; `0` means
/// "never"
pub type Timestamp = i64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_ts() -> Timestamp {
    Utc::now().timestamp_micros()
}

/// Unique identifier for a cluster node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// Key under which a node publishes a value in the shared store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(key: impl Into<String>) -> Self {
        StoreKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StoreKey {
    fn from(s: String) -> Self {
        StoreKey(s)
    }
}

impl From<&str> for StoreKey {
    fn from(s: &str) -> Self {
        StoreKey(s.to_string())
    }
}

/// Liveness status of a node as observed by the local membership layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Invalid,
    NeverGossiped,
    NotInQuorum,
    Up,
    Down,
    Suspect,
    Left,
}

impl NodeStatus {
    /// A status-valid node is one whose user data may be trusted and
    /// overwritten by newer gossip. Nodes that have never gossiped carry
    /// no trustworthy data yet.
    pub fn is_valid(&self) -> bool {
        !matches!(self, NodeStatus::Invalid | NodeStatus::NeverGossiped)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::Invalid => "invalid",
            NodeStatus::NeverGossiped => "never-gossiped",
            NodeStatus::NotInQuorum => "not-in-quorum",
            NodeStatus::Up => "up",
            NodeStatus::Down => "down",
            NodeStatus::Suspect => "suspect",
            NodeStatus::Left => "left",
        };
        write!(f, "{}", name)
    }
}

/// State held about one peer: the atomic unit of gossip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node identifier
    pub id: NodeId,
    /// Generation number of the peer's process incarnation; `0` is
    /// [`INVALID_GEN_NUMBER`]
    pub gen_number: u64,
    /// Timestamp of the last observed mutation of this record
    pub last_update_ts: Timestamp,
    /// Timestamp used to delay adoption until the peer's generation is
    /// observed
    pub wait_for_gen_update_ts: Timestamp,
    /// Liveness status; authoritative only from local membership evidence
    pub status: NodeStatus,
    /// Opaque user payload published by the peer
    pub value: ValueMap,
    /// Does this node count toward quorum?
    pub quorum_member: bool,
    /// Failure-domain label (may be empty)
    pub cluster_domain: String,
    /// Network endpoint, informational only
    pub addr: String,
}

impl NodeInfo {
    /// Create a fresh record for `id` with the given status and the
    /// current time on both timestamps
    pub fn new(id: NodeId, status: NodeStatus) -> Self {
        let now = now_ts();
        NodeInfo {
            id,
            gen_number: INVALID_GEN_NUMBER,
            last_update_ts: now,
            wait_for_gen_update_ts: now,
            status,
            value: ValueMap::new(),
            quorum_member: false,
            cluster_domain: String::new(),
            addr: String::new(),
        }
    }
}

/// The locally known view of every peer, keyed by node identifier
pub type NodeInfoMap = HashMap<NodeId, NodeInfo>;

/// Per-key projection of a node's state returned by key lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeValue {
    pub id: NodeId,
    pub gen_number: u64,
    pub last_update_ts: Timestamp,
    pub status: NodeStatus,
    /// `None` means the key is known-absent on a node publishing an
    /// empty payload map
    pub value: Option<StoreValue>,
}

/// Key lookup result across all status-valid nodes
pub type NodeValueMap = HashMap<NodeId, NodeValue>;

/// Identity and versioning summary exchanged ahead of a full state
/// snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetaInfo {
    pub id: NodeId,
    pub last_update_ts: Timestamp,
    pub gossip_version: String,
    pub cluster_id: String,
}

/// Authoritative peer description supplied to the cluster reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub quorum_member: bool,
    pub cluster_domain: String,
    pub addr: String,
}

impl NodeUpdate {
    pub fn new(quorum_member: bool, cluster_domain: impl Into<String>, addr: impl Into<String>) -> Self {
        NodeUpdate {
            quorum_member,
            cluster_domain: cluster_domain.into(),
            addr: addr.into(),
        }
    }
}

/// Count of quorum members per failure-domain label
pub type ClusterDomainsQuorumMembersMap = HashMap<String, usize>;
