//! Membership transport entry points
//!
//! The failure-detection transport (memberlist-style) observes joins,
//! leaves, and reconciliations and drives the store through this
//! delegate. The store itself never touches the network; remote
//! snapshots arrive here as bytes plus the sender's meta info.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::store::GossipStore;
use super::types::{ClusterDomainsQuorumMembersMap, NodeId, NodeMetaInfo, NodeStatus, NodeUpdate};
use super::wire::{self, WireError};
use super::GossipResult;

/// Adapter between the membership transport and the gossip store
pub struct MembershipDelegate {
    store: Arc<GossipStore>,
    leave_grace: Duration,
}

impl MembershipDelegate {
    pub fn new(store: Arc<GossipStore>, leave_grace: Duration) -> Self {
        MembershipDelegate { store, leave_grace }
    }

    /// A peer joined the cluster: record it as UP
    pub async fn notify_join(
        &self,
        id: NodeId,
        quorum_member: bool,
        cluster_domain: &str,
        addr: &str,
    ) {
        info!("Node {} joined at {}", id, addr);
        self.store
            .add_node(id.clone(), NodeStatus::Up, quorum_member, cluster_domain);
        self.store.set_node_addr(&id, addr);
        if let Err(err) = self.store.update_node_status(&id, NodeStatus::Up) {
            warn!("Status refresh for joined node {} failed: {}", id, err);
        }
    }

    /// A peer left: mark it DOWN now, remove it after the leave grace
    /// period on a background task
    pub async fn notify_leave(&self, id: NodeId) -> GossipResult<()> {
        info!("Node {} left, removing after {:?}", id, self.leave_grace);
        self.store.update_node_status(&id, NodeStatus::Down)?;

        let store = Arc::clone(&self.store);
        let grace = self.leave_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(err) = store.remove_node(&id) {
                warn!("Deferred removal of node {} skipped: {}", id, err);
            }
        });
        Ok(())
    }

    /// The authoritative peer list changed: reconcile the store against
    /// it and report the per-domain quorum-member counts
    pub async fn notify_reconcile(
        &self,
        peers: &HashMap<NodeId, NodeUpdate>,
    ) -> ClusterDomainsQuorumMembersMap {
        self.store.update_cluster(peers)
    }

    /// A peer sent its state snapshot: screen the gossip version, decode,
    /// and merge. A mismatched or undecodable snapshot leaves the local
    /// state untouched.
    pub async fn deliver_remote_state(
        &self,
        buf: &[u8],
        peer_meta: &NodeMetaInfo,
    ) -> GossipResult<()> {
        if peer_meta.gossip_version != self.store.gossip_version() {
            warn!(
                "Rejecting snapshot from {}: gossip version {} does not match local {}",
                peer_meta.id, peer_meta.gossip_version, self.store.gossip_version()
            );
            return Err(WireError::VersionMismatch {
                local: self.store.gossip_version().to_string(),
                remote: peer_meta.gossip_version.clone(),
            }
            .into());
        }
        let diff = wire::from_bytes(buf)?;
        self.store.update(diff);
        Ok(())
    }
}
