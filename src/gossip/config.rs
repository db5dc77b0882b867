//! Configuration inputs for the gossip store and its collaborators

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::quorum::FailureDomainPolicy;
use super::types::NodeId;

/// Errors raised by configuration validation
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("self node id must not be empty")]
    EmptySelfId,

    #[error("gossip version must not be empty")]
    EmptyGossipVersion,
}

/// Configuration for one node's gossip store
///
/// All values come from the owning daemon; nothing here is discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipConfig {
    /// This node's identifier
    pub self_id: NodeId,
    /// Wire-compatibility version; snapshots from other versions are
    /// rejected
    pub gossip_version: String,
    /// Cluster identifier, surfaced in meta info
    pub cluster_id: String,
    /// Failure-domain label this node starts in (may be empty)
    pub self_cluster_domain: String,
    /// How long the node stays NOT_IN_QUORUM after losing quorum, even
    /// if counts recover
    pub quorum_loss_grace: Duration,
    /// Delay between a leave notification and removal from the store
    pub leave_grace: Duration,
    /// Failure-domain diversity required for quorum
    pub failure_domain_policy: FailureDomainPolicy,
}

impl GossipConfig {
    /// Create a configuration with default grace periods and no
    /// failure-domain policy
    pub fn new(
        self_id: impl Into<NodeId>,
        gossip_version: impl Into<String>,
        cluster_id: impl Into<String>,
        self_cluster_domain: impl Into<String>,
    ) -> Self {
        GossipConfig {
            self_id: self_id.into(),
            gossip_version: gossip_version.into(),
            cluster_id: cluster_id.into(),
            self_cluster_domain: self_cluster_domain.into(),
            quorum_loss_grace: Duration::from_secs(60),
            leave_grace: Duration::from_secs(30),
            failure_domain_policy: FailureDomainPolicy::None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.self_id.as_str().is_empty() {
            return Err(ConfigError::EmptySelfId);
        }
        if self.gossip_version.is_empty() {
            return Err(ConfigError::EmptyGossipVersion);
        }
        Ok(())
    }
}
