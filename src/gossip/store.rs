//! Gossip store: the locally known view of every peer
//!
//! One instance per process. Holds a node map keyed by node id (always
//! containing the self entry), the externally asserted cluster size, and
//! the failure-domain index. All operations are serialized by a single
//! store mutex; the failure-domain index has its own strictly-inner lock.
//!
//! Three write paths feed the map:
//! - self mutations from the owning daemon,
//! - membership events from the transport (add/remove/status),
//! - anti-entropy merges of remote snapshots ([`GossipStore::update`]).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use super::config::{ConfigError, GossipConfig};
use super::domains::FailureDomainIndex;
use super::types::{
    now_ts, ClusterDomainsQuorumMembersMap, NodeId, NodeInfo, NodeInfoMap, NodeMetaInfo,
    NodeStatus, NodeUpdate, NodeValue, NodeValueMap, StoreKey, Timestamp, INVALID_GEN_NUMBER,
};
use super::value::{StoreValue, ValueMap};
use super::wire::{self, WireResult};

/// Errors surfaced by store operations
#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("refusing to remove self entry {0}")]
    SelfRemoval(NodeId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stamp a record mutation. Clamped forward so per-entry timestamps are
/// strictly monotonic even if the wall clock jumps backward.
fn stamp(info: &mut NodeInfo) {
    info.last_update_ts = now_ts().max(info.last_update_ts + 1);
}

/// Mutable state guarded by the store mutex
#[derive(Debug)]
struct StoreState {
    node_map: NodeInfoMap,
    gen_number: u64,
    cluster_size: usize,
    lost_quorum_ts: Timestamp,
    self_correct: bool,
}

impl StoreState {
    /// The self entry is created at init and cannot be removed through
    /// the public API; its absence is a broken contract.
    fn self_info_mut(&mut self, self_id: &NodeId) -> &mut NodeInfo {
        self.node_map
            .get_mut(self_id)
            .expect("self entry missing from gossip map")
    }

    fn add_node(&mut self, id: NodeId, status: NodeStatus, quorum_member: bool, cluster_domain: &str) {
        if let Some(info) = self.node_map.get_mut(&id) {
            info.status = status;
            info.quorum_member = quorum_member;
            info.cluster_domain = cluster_domain.to_string();
            stamp(info);
            return;
        }

        let now = now_ts();
        info!("Adding node {} to gossip map", id);
        self.node_map.insert(
            id.clone(),
            NodeInfo {
                id,
                gen_number: INVALID_GEN_NUMBER,
                last_update_ts: now,
                wait_for_gen_update_ts: now,
                status,
                value: ValueMap::new(),
                quorum_member,
                cluster_domain: cluster_domain.to_string(),
                addr: String::new(),
            },
        );
    }

    fn remove_node(&mut self, id: &NodeId) -> StoreResult<()> {
        if self.node_map.remove(id).is_none() {
            return Err(StoreError::NodeNotFound(id.clone()));
        }
        info!("Removing node {} from gossip map", id);
        Ok(())
    }
}

/// Concurrent, in-memory container of [`NodeInfo`] records plus self
/// identity and cluster metadata
///
/// Snapshots returned by the accessors are copies; callers can mutate
/// them freely without affecting the live store.
#[derive(Debug)]
pub struct GossipStore {
    self_id: NodeId,
    gossip_version: String,
    cluster_id: String,
    self_cluster_domain: String,
    state: Mutex<StoreState>,
    domains: FailureDomainIndex,
}

impl GossipStore {
    /// Create a store for the configured identity
    ///
    /// The self entry starts NOT_IN_QUORUM. The constructor path leaves
    /// self-correction disabled; [`GossipStore::init_store`] enables it.
    pub fn new(config: GossipConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = GossipStore {
            self_id: config.self_id,
            gossip_version: config.gossip_version,
            cluster_id: config.cluster_id,
            self_cluster_domain: config.self_cluster_domain,
            state: Mutex::new(StoreState {
                node_map: NodeInfoMap::new(),
                gen_number: 0,
                cluster_size: 0,
                lost_quorum_ts: 0,
                self_correct: false,
            }),
            domains: FailureDomainIndex::new(),
        };
        store.init_store(NodeStatus::NotInQuorum);
        store.state.lock().unwrap().self_correct = false;
        Ok(store)
    }

    /// Reset the node map to a fresh self entry with the given status
    /// and enable self-correction on merges
    pub fn init_store(&self, status: NodeStatus) {
        let mut state = self.state.lock().unwrap();
        let mut info = NodeInfo::new(self.self_id.clone(), status);
        info.gen_number = state.gen_number;
        info.cluster_domain = self.self_cluster_domain.clone();
        state.node_map = NodeInfoMap::new();
        state.node_map.insert(self.self_id.clone(), info);
        state.self_correct = true;
        self.domains.clear();
        self.domains.update(&self.self_cluster_domain, &self.self_id);
    }

    /// This node's identifier
    pub fn node_id(&self) -> &NodeId {
        &self.self_id
    }

    /// Self generation number
    pub fn gen_number(&self) -> u64 {
        self.state.lock().unwrap().gen_number
    }

    /// Wire-compatibility version of this store
    pub fn gossip_version(&self) -> &str {
        &self.gossip_version
    }

    /// Cluster identifier
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Snapshot of the self entry
    pub fn self_info(&self) -> NodeInfo {
        let mut state = self.state.lock().unwrap();
        state.self_info_mut(&self.self_id).clone()
    }

    /// Publish a key/value pair on the self entry
    pub fn update_self(&self, key: StoreKey, val: StoreValue) {
        let mut state = self.state.lock().unwrap();
        let info = state.self_info_mut(&self.self_id);
        info.value.insert(key, val);
        stamp(info);
    }

    /// Set the self liveness status
    pub fn update_self_status(&self, status: NodeStatus) {
        let mut state = self.state.lock().unwrap();
        let info = state.self_info_mut(&self.self_id);
        info.status = status;
        stamp(info);
    }

    /// Current self liveness status
    pub fn get_self_status(&self) -> NodeStatus {
        let mut state = self.state.lock().unwrap();
        state.self_info_mut(&self.self_id).status
    }

    /// Move self to another failure domain. Returns whether anything
    /// changed; a no-op change does not bump the timestamp.
    pub fn update_self_cluster_domain(&self, cluster_domain: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let info = state.self_info_mut(&self.self_id);
        if info.cluster_domain == cluster_domain {
            return false;
        }
        info!(
            "Moving self from failure domain {:?} to {:?}",
            info.cluster_domain, cluster_domain
        );
        info.cluster_domain = cluster_domain.to_string();
        stamp(info);
        self.domains.update(cluster_domain, &self.self_id);
        true
    }

    /// Set the liveness status of a known node
    pub fn update_node_status(&self, id: &NodeId, status: NodeStatus) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.node_map.get_mut(id) {
            Some(info) => {
                info.status = status;
                stamp(info);
                Ok(())
            }
            None => Err(StoreError::NodeNotFound(id.clone())),
        }
    }

    /// Add a node to the map, or refresh its membership fields if it is
    /// already known
    pub fn add_node(&self, id: NodeId, status: NodeStatus, quorum_member: bool, cluster_domain: &str) {
        let mut state = self.state.lock().unwrap();
        state.add_node(id.clone(), status, quorum_member, cluster_domain);
        self.domains.update(cluster_domain, &id);
    }

    /// Remove a node from the map. The self entry cannot be removed.
    pub fn remove_node(&self, id: &NodeId) -> StoreResult<()> {
        if *id == self.self_id {
            return Err(StoreError::SelfRemoval(id.clone()));
        }
        let mut state = self.state.lock().unwrap();
        state.remove_node(id)?;
        self.domains.remove(id);
        Ok(())
    }

    pub(crate) fn set_node_addr(&self, id: &NodeId, addr: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.node_map.get_mut(id) {
            info.addr = addr.to_string();
        }
    }

    /// Snapshot of the whole node map
    pub fn get_local_state(&self) -> NodeInfoMap {
        self.state.lock().unwrap().node_map.clone()
    }

    /// Snapshot of the whole node map, encoded for transmission
    ///
    /// The copy is taken under the lock; encoding happens outside it.
    pub fn local_state_in_bytes(&self) -> WireResult<Vec<u8>> {
        let snapshot = self.get_local_state();
        wire::to_bytes(&snapshot)
    }

    /// Snapshot of one node's record
    pub fn get_local_node_info(&self, id: &NodeId) -> StoreResult<NodeInfo> {
        let state = self.state.lock().unwrap();
        state
            .node_map
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NodeNotFound(id.clone()))
    }

    /// Collect `key` across all status-valid nodes
    ///
    /// A node with a non-empty payload that lacks `key` is omitted; a
    /// node with an empty payload appears with `value: None`. Callers
    /// can therefore tell "unknown" from "known-absent".
    pub fn get_store_key_value(&self, key: &StoreKey) -> NodeValueMap {
        let state = self.state.lock().unwrap();
        let mut out = NodeValueMap::new();
        for (id, info) in state.node_map.iter() {
            if !info.status.is_valid() {
                continue;
            }
            let empty = info.value.is_empty();
            let val = info.value.get(key);
            if empty || val.is_some() {
                out.insert(
                    id.clone(),
                    NodeValue {
                        id: info.id.clone(),
                        gen_number: info.gen_number,
                        last_update_ts: info.last_update_ts,
                        status: info.status,
                        value: val.cloned(),
                    },
                );
            }
        }
        out
    }

    /// Every key published by any node
    pub fn get_store_keys(&self) -> HashSet<StoreKey> {
        let state = self.state.lock().unwrap();
        let mut keys = HashSet::new();
        for info in state.node_map.values() {
            for key in info.value.keys() {
                keys.insert(key.clone());
            }
        }
        keys
    }

    /// Identity and versioning summary for handshake exchange
    pub fn meta_info(&self) -> NodeMetaInfo {
        let mut state = self.state.lock().unwrap();
        let info = state.self_info_mut(&self.self_id);
        NodeMetaInfo {
            id: info.id.clone(),
            last_update_ts: info.last_update_ts,
            gossip_version: self.gossip_version.clone(),
            cluster_id: self.cluster_id.clone(),
        }
    }

    /// Externally asserted cluster size, which may differ from the
    /// number of known nodes
    pub fn cluster_size(&self) -> usize {
        self.state.lock().unwrap().cluster_size
    }

    /// Assert the cluster size from an external source of truth (e.g. a
    /// kv database), independent of reconciliation
    pub fn update_cluster_size(&self, size: usize) {
        self.state.lock().unwrap().cluster_size = size;
    }

    /// Timestamp of the most recent quorum loss; `0` if never lost
    pub fn lost_quorum_ts(&self) -> Timestamp {
        self.state.lock().unwrap().lost_quorum_ts
    }

    /// Record a quorum loss at the current time
    pub fn update_lost_quorum_ts(&self) {
        self.state.lock().unwrap().lost_quorum_ts = now_ts();
    }

    /// Snapshot of one failure domain's membership
    pub fn nodes_in_domain(&self, domain: &str) -> HashSet<NodeId> {
        self.domains.nodes_in(domain)
    }

    /// Snapshot of the whole failure-domain index
    pub fn failure_domains(&self) -> HashMap<String, HashSet<NodeId>> {
        self.domains.snapshot()
    }

    /// Count quorum members per failure domain from the current map
    pub fn domain_quorum_members(&self) -> ClusterDomainsQuorumMembersMap {
        let state = self.state.lock().unwrap();
        let mut counts = ClusterDomainsQuorumMembersMap::new();
        for info in state.node_map.values() {
            if info.quorum_member {
                *counts.entry(info.cluster_domain.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Merge a remote snapshot into the local view (anti-entropy)
    ///
    /// Last-writer-wins on the per-entry timestamp, with two hard rules:
    /// membership is authoritative, so ids we do not already know are
    /// ignored; and a peer's status is only ever set from local
    /// membership evidence, so the incumbent status survives adoption.
    pub fn update(&self, diff: NodeInfoMap) {
        let mut state = self.state.lock().unwrap();
        for (id, mut remote) in diff {
            if id == self.self_id {
                if state.self_correct && !state.node_map.contains_key(&self.self_id) {
                    // Some external actor dropped our own entry; take the
                    // remote view of us back, but never its status.
                    remote.status = NodeStatus::NotInQuorum;
                    self.domains.update(&remote.cluster_domain, &id);
                    state.node_map.insert(id, remote);
                }
                continue;
            }
            let (adopt, local_status) = match state.node_map.get(&id) {
                Some(local) => (
                    !local.status.is_valid() || local.last_update_ts < remote.last_update_ts,
                    local.status,
                ),
                None => continue,
            };
            if adopt {
                remote.status = local_status;
                self.domains.update(&remote.cluster_domain, &id);
                state.node_map.insert(id, remote);
            }
        }
    }

    /// Reconcile the map against an authoritative peer list
    ///
    /// Sets the cluster size, removes nodes that are no longer peers
    /// (never self), adds unknown peers as DOWN, refreshes membership
    /// fields and the failure-domain index for every listed peer, and
    /// returns the per-domain quorum-member counts.
    pub fn update_cluster(
        &self,
        peers: &HashMap<NodeId, NodeUpdate>,
    ) -> ClusterDomainsQuorumMembersMap {
        let mut state = self.state.lock().unwrap();
        state.cluster_size = peers.len();

        let remove_node_ids: Vec<NodeId> = state
            .node_map
            .keys()
            .filter(|id| **id != self.self_id && !peers.contains_key(*id))
            .cloned()
            .collect();
        let add_node_ids: Vec<NodeId> = peers
            .keys()
            .filter(|id| !state.node_map.contains_key(*id))
            .cloned()
            .collect();

        for id in &remove_node_ids {
            // Known to exist; the error cannot fire here.
            let _ = state.remove_node(id);
            self.domains.remove(id);
        }
        for id in add_node_ids {
            let update = &peers[&id];
            state.add_node(
                id.clone(),
                NodeStatus::Down,
                update.quorum_member,
                &update.cluster_domain,
            );
            self.domains.update(&update.cluster_domain, &id);
        }

        let mut quorum_members = ClusterDomainsQuorumMembersMap::new();
        for (id, info) in state.node_map.iter_mut() {
            if let Some(update) = peers.get(id) {
                info.quorum_member = update.quorum_member;
                info.cluster_domain = update.cluster_domain.clone();
                info.addr = update.addr.clone();
                self.domains.update(&update.cluster_domain, id);
            }
            if info.quorum_member {
                *quorum_members.entry(info.cluster_domain.clone()).or_insert(0) += 1;
            }
        }
        quorum_members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> GossipStore {
        let config = GossipConfig::new("A", "v1", "C", "d1");
        GossipStore::new(config).unwrap()
    }

    fn peer_info(id: &str, ts_offset: i64, status: NodeStatus) -> NodeInfo {
        let mut info = NodeInfo::new(NodeId::new(id), status);
        info.last_update_ts = now_ts() + ts_offset;
        info
    }

    #[test]
    fn test_init_and_self_update() {
        let store = test_store();
        store.update_self(StoreKey::new("k"), "v".into());

        let values = store.get_store_key_value(&StoreKey::new("k"));
        let entry = values.get(&NodeId::new("A")).unwrap();
        assert_eq!(entry.id, NodeId::new("A"));
        assert_eq!(entry.status, NodeStatus::NotInQuorum);
        assert_eq!(entry.value.as_ref().unwrap().as_string(), Some("v"));
    }

    #[test]
    fn test_self_entry_always_present() {
        let store = test_store();
        let state = store.get_local_state();
        assert!(state.contains_key(&NodeId::new("A")));
        assert_eq!(store.meta_info().id, NodeId::new("A"));
        assert_eq!(store.meta_info().gossip_version, "v1");
        assert_eq!(store.meta_info().cluster_id, "C");
    }

    #[test]
    fn test_merge_ignores_unknown_node() {
        let store = test_store();
        let mut diff = NodeInfoMap::new();
        let mut remote = peer_info("B", 0, NodeStatus::Up);
        remote.value.insert(StoreKey::new("k"), 1i64.into());
        diff.insert(remote.id.clone(), remote);

        store.update(diff);

        assert_eq!(
            store.get_local_node_info(&NodeId::new("B")),
            Err(StoreError::NodeNotFound(NodeId::new("B")))
        );
    }

    #[test]
    fn test_merge_preserves_local_status() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::Down, true, "d1");

        let mut remote = peer_info("B", 1_000_000, NodeStatus::Up);
        remote.value.insert(StoreKey::new("k"), 7i64.into());
        let mut diff = NodeInfoMap::new();
        diff.insert(remote.id.clone(), remote);
        store.update(diff);

        let merged = store.get_local_node_info(&NodeId::new("B")).unwrap();
        assert_eq!(merged.status, NodeStatus::Down);
        assert_eq!(
            merged.value.get(&StoreKey::new("k")).unwrap().as_integer(),
            Some(7)
        );
    }

    #[test]
    fn test_merge_skips_stale_and_tied_timestamps() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::Up, true, "d1");
        let local_ts = store
            .get_local_node_info(&NodeId::new("B"))
            .unwrap()
            .last_update_ts;

        // Equal timestamp: incumbent wins.
        let mut tied = peer_info("B", 0, NodeStatus::Up);
        tied.last_update_ts = local_ts;
        tied.value.insert(StoreKey::new("k"), 1i64.into());
        let mut diff = NodeInfoMap::new();
        diff.insert(tied.id.clone(), tied);
        store.update(diff);
        assert!(store
            .get_local_node_info(&NodeId::new("B"))
            .unwrap()
            .value
            .is_empty());

        // Older timestamp: incumbent wins.
        let mut stale = peer_info("B", 0, NodeStatus::Up);
        stale.last_update_ts = local_ts - 1;
        stale.value.insert(StoreKey::new("k"), 2i64.into());
        let mut diff = NodeInfoMap::new();
        diff.insert(stale.id.clone(), stale);
        store.update(diff);
        assert!(store
            .get_local_node_info(&NodeId::new("B"))
            .unwrap()
            .value
            .is_empty());
    }

    #[test]
    fn test_merge_adopts_over_invalid_status() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::NeverGossiped, true, "d1");

        // Remote timestamp is older than ours, but our view has never
        // seen B gossip, so the remote view is still better than nothing.
        let mut remote = peer_info("B", -10_000_000, NodeStatus::Up);
        remote.value.insert(StoreKey::new("k"), 9i64.into());
        let mut diff = NodeInfoMap::new();
        diff.insert(remote.id.clone(), remote);
        store.update(diff);

        let merged = store.get_local_node_info(&NodeId::new("B")).unwrap();
        assert_eq!(merged.status, NodeStatus::NeverGossiped);
        assert_eq!(
            merged.value.get(&StoreKey::new("k")).unwrap().as_integer(),
            Some(9)
        );
    }

    #[test]
    fn test_merge_ignores_self() {
        let store = test_store();
        let before = store.self_info();

        let mut remote_self = peer_info("A", 10_000_000, NodeStatus::Down);
        remote_self.value.insert(StoreKey::new("k"), 1i64.into());
        let mut diff = NodeInfoMap::new();
        diff.insert(remote_self.id.clone(), remote_self);
        store.update(diff);

        assert_eq!(store.self_info(), before);
    }

    #[test]
    fn test_merge_reinserts_self_only_when_self_correcting() {
        let store = test_store();
        store.init_store(NodeStatus::NotInQuorum);

        // Simulate external corruption of the map.
        store
            .state
            .lock()
            .unwrap()
            .node_map
            .remove(&NodeId::new("A"));

        let mut diff = NodeInfoMap::new();
        diff.insert(NodeId::new("A"), peer_info("A", 0, NodeStatus::Up));
        store.update(diff);

        let restored = store.get_local_node_info(&NodeId::new("A")).unwrap();
        assert_eq!(restored.status, NodeStatus::NotInQuorum);

        // The constructor path leaves self-correction off.
        let store = test_store();
        store
            .state
            .lock()
            .unwrap()
            .node_map
            .remove(&NodeId::new("A"));
        let mut diff = NodeInfoMap::new();
        diff.insert(NodeId::new("A"), peer_info("A", 0, NodeStatus::Up));
        store.update(diff);
        assert!(store.get_local_node_info(&NodeId::new("A")).is_err());
    }

    #[test]
    fn test_update_cluster_add_remove() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::Up, true, "d1");

        let mut peers = HashMap::new();
        peers.insert(NodeId::new("A"), NodeUpdate::new(true, "d1", "10.0.0.1"));
        peers.insert(NodeId::new("C"), NodeUpdate::new(true, "d2", "10.0.0.3"));
        let quorum_members = store.update_cluster(&peers);

        let state = store.get_local_state();
        let mut ids: Vec<&str> = state.keys().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["A", "C"]);

        assert_eq!(store.nodes_in_domain("d1"), HashSet::from([NodeId::new("A")]));
        assert_eq!(store.nodes_in_domain("d2"), HashSet::from([NodeId::new("C")]));

        assert_eq!(quorum_members.get("d1"), Some(&1));
        assert_eq!(quorum_members.get("d2"), Some(&1));
        assert_eq!(store.cluster_size(), 2);

        // New peers come up as DOWN until membership says otherwise.
        assert_eq!(
            store.get_local_node_info(&NodeId::new("C")).unwrap().status,
            NodeStatus::Down
        );
        assert_eq!(
            store.get_local_node_info(&NodeId::new("C")).unwrap().addr,
            "10.0.0.3"
        );
    }

    #[test]
    fn test_update_cluster_never_removes_self() {
        let store = test_store();
        let mut peers = HashMap::new();
        peers.insert(NodeId::new("B"), NodeUpdate::new(true, "d1", ""));
        store.update_cluster(&peers);

        assert!(store.get_local_state().contains_key(&NodeId::new("A")));
        assert_eq!(store.cluster_size(), 1);
    }

    #[test]
    fn test_update_cluster_is_idempotent() {
        let store = test_store();
        let mut peers = HashMap::new();
        peers.insert(NodeId::new("A"), NodeUpdate::new(true, "d1", "a:9002"));
        peers.insert(NodeId::new("B"), NodeUpdate::new(false, "d2", "b:9002"));

        let first = store.update_cluster(&peers);
        let state_first = store.get_local_state();
        let second = store.update_cluster(&peers);

        assert_eq!(first, second);
        assert_eq!(store.get_local_state(), state_first);
        assert_eq!(store.failure_domains(), {
            let mut expected = HashMap::new();
            expected.insert("d1".to_string(), HashSet::from([NodeId::new("A")]));
            expected.insert("d2".to_string(), HashSet::from([NodeId::new("B")]));
            expected
        });
    }

    #[test]
    fn test_self_domain_reindex() {
        let store = test_store();
        assert!(store.nodes_in_domain("d1").contains(&NodeId::new("A")));

        assert!(store.update_self_cluster_domain("d2"));
        assert!(!store.nodes_in_domain("d1").contains(&NodeId::new("A")));
        assert!(store.nodes_in_domain("d2").contains(&NodeId::new("A")));

        // Same domain again: no change reported, no timestamp churn.
        let ts = store.self_info().last_update_ts;
        assert!(!store.update_self_cluster_domain("d2"));
        assert_eq!(store.self_info().last_update_ts, ts);
    }

    #[test]
    fn test_self_timestamps_are_monotonic() {
        let store = test_store();
        let mut last = store.self_info().last_update_ts;
        for i in 0i64..100 {
            store.update_self(StoreKey::new("seq"), i.into());
            let ts = store.self_info().last_update_ts;
            assert!(ts > last);
            last = ts;
        }
    }

    #[test]
    fn test_unknown_node_operations_fail() {
        let store = test_store();
        let ghost = NodeId::new("ghost");
        assert_eq!(
            store.update_node_status(&ghost, NodeStatus::Up),
            Err(StoreError::NodeNotFound(ghost.clone()))
        );
        assert_eq!(
            store.remove_node(&ghost),
            Err(StoreError::NodeNotFound(ghost.clone()))
        );
        assert!(store.get_local_node_info(&ghost).is_err());
    }

    #[test]
    fn test_remove_self_is_refused() {
        let store = test_store();
        assert_eq!(
            store.remove_node(&NodeId::new("A")),
            Err(StoreError::SelfRemoval(NodeId::new("A")))
        );
        assert!(store.get_local_state().contains_key(&NodeId::new("A")));
    }

    #[test]
    fn test_remove_node_clears_domain_index() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::Up, true, "d2");
        store.remove_node(&NodeId::new("B")).unwrap();
        assert!(store.nodes_in_domain("d2").is_empty());
    }

    #[test]
    fn test_get_store_key_value_empty_payload_surfaces() {
        let store = test_store();
        // B is status-valid with an empty payload: surfaced with None.
        store.add_node(NodeId::new("B"), NodeStatus::Up, true, "d1");
        // C has gossiped other keys but not this one: omitted.
        store.add_node(NodeId::new("C"), NodeStatus::Up, true, "d1");
        let mut c_diff = NodeInfoMap::new();
        let mut c_remote = peer_info("C", 1_000_000, NodeStatus::Up);
        c_remote.value.insert(StoreKey::new("other"), 1i64.into());
        c_diff.insert(c_remote.id.clone(), c_remote);
        store.update(c_diff);
        // D has never gossiped: not status-valid, omitted.
        store.add_node(NodeId::new("D"), NodeStatus::NeverGossiped, true, "d1");

        store.update_self(StoreKey::new("k"), "v".into());
        let values = store.get_store_key_value(&StoreKey::new("k"));

        assert!(values.contains_key(&NodeId::new("A")));
        assert_eq!(values.get(&NodeId::new("B")).unwrap().value, None);
        assert!(!values.contains_key(&NodeId::new("C")));
        assert!(!values.contains_key(&NodeId::new("D")));
    }

    #[test]
    fn test_get_store_keys() {
        let store = test_store();
        store.update_self(StoreKey::new("k1"), 1i64.into());
        store.update_self(StoreKey::new("k2"), 2i64.into());
        store.update_self(StoreKey::new("k2"), 3i64.into());

        let keys = store.get_store_keys();
        assert_eq!(
            keys,
            HashSet::from([StoreKey::new("k1"), StoreKey::new("k2")])
        );
    }

    #[test]
    fn test_snapshots_are_isolated_copies() {
        let store = test_store();
        let mut snapshot = store.get_local_state();
        snapshot.remove(&NodeId::new("A"));
        snapshot.insert(
            NodeId::new("Z"),
            NodeInfo::new(NodeId::new("Z"), NodeStatus::Up),
        );

        assert!(store.get_local_state().contains_key(&NodeId::new("A")));
        assert!(!store.get_local_state().contains_key(&NodeId::new("Z")));
    }

    #[test]
    fn test_local_state_bytes_round_trip() {
        let store = test_store();
        store.update_self(StoreKey::new("k"), "v".into());
        store.add_node(NodeId::new("B"), NodeStatus::Down, true, "d2");

        let bytes = store.local_state_in_bytes().unwrap();
        let decoded = wire::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, store.get_local_state());
    }

    #[test]
    fn test_lost_quorum_ts() {
        let store = test_store();
        assert_eq!(store.lost_quorum_ts(), 0);
        store.update_lost_quorum_ts();
        assert!(store.lost_quorum_ts() > 0);
    }

    #[test]
    fn test_concurrent_self_updates() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(test_store());
        let before = store.self_info().last_update_ts;

        let mut handles = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100i64 {
                    store.update_self(StoreKey::new(format!("t{}", t)), i.into());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let info = store.self_info();
        assert_eq!(info.value.len(), 4);
        for t in 0..4 {
            assert_eq!(
                info.value
                    .get(&StoreKey::new(format!("t{}", t)))
                    .unwrap()
                    .as_integer(),
                Some(99)
            );
        }
        assert!(info.last_update_ts > before);
    }

    #[test]
    fn test_domain_quorum_members() {
        let store = test_store();
        store.add_node(NodeId::new("B"), NodeStatus::Up, true, "d1");
        store.add_node(NodeId::new("C"), NodeStatus::Up, false, "d2");

        let counts = store.domain_quorum_members();
        assert_eq!(counts.get("d1"), Some(&1));
        assert_eq!(counts.get("d2"), None);
    }
}
