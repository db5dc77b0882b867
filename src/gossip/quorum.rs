//! Quorum evaluation for the local node
//!
//! Given the current view of peer statuses, the externally asserted
//! cluster size, and the failure-domain topology, decide whether this
//! node should consider itself in quorum. The evaluator is pure; the
//! [`QuorumEvaluator::apply`] driver feeds it store snapshots and writes
//! the outcome back.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

use super::store::GossipStore;
use super::types::{now_ts, NodeId, NodeInfoMap, NodeStatus, Timestamp};

/// Failure-domain diversity required before the node considers itself
/// in quorum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureDomainPolicy {
    /// Ignore failure domains
    #[default]
    None,
    /// UP quorum members must span a strict majority of the domains that
    /// hold quorum members
    MajorityDomains,
    /// Every domain holding quorum members must hold an UP one
    AllDomains,
}

/// Inputs to one quorum evaluation, snapshotted from the store
#[derive(Debug, Clone)]
pub struct QuorumView {
    pub self_id: NodeId,
    pub self_status: NodeStatus,
    pub cluster_size: usize,
    pub nodes: NodeInfoMap,
    pub lost_quorum_ts: Timestamp,
}

/// Outcome of a quorum evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuorumDecision {
    /// Desired self status: `Up` or `NotInQuorum`
    pub status: NodeStatus,
    /// True when this evaluation is the UP -> NOT_IN_QUORUM transition
    pub quorum_lost: bool,
}

/// Decides the node's own quorum status
#[derive(Debug, Clone)]
pub struct QuorumEvaluator {
    policy: FailureDomainPolicy,
    loss_grace: Duration,
}

impl QuorumEvaluator {
    pub fn new(policy: FailureDomainPolicy, loss_grace: Duration) -> Self {
        QuorumEvaluator { policy, loss_grace }
    }

    /// Build from the configured policy and grace period
    pub fn from_config(config: &super::config::GossipConfig) -> Self {
        QuorumEvaluator::new(config.failure_domain_policy, config.quorum_loss_grace)
    }

    /// Evaluate the desired self status at `now`
    ///
    /// Idempotent and pure given its inputs.
    pub fn evaluate(&self, view: &QuorumView, now: Timestamp) -> QuorumDecision {
        let up = view
            .nodes
            .values()
            .filter(|info| {
                info.quorum_member
                    && (info.id == view.self_id || info.status == NodeStatus::Up)
            })
            .count();

        let in_quorum = up > view.cluster_size / 2 && self.domain_policy_satisfied(view);

        if !in_quorum {
            return QuorumDecision {
                status: NodeStatus::NotInQuorum,
                quorum_lost: view.self_status == NodeStatus::Up,
            };
        }

        // Debounce flapping: once quorum was lost, stay out for the full
        // grace period even if counts recover.
        let grace = self.loss_grace.as_micros() as i64;
        if view.self_status == NodeStatus::NotInQuorum
            && view.lost_quorum_ts != 0
            && now < view.lost_quorum_ts + grace
        {
            return QuorumDecision {
                status: NodeStatus::NotInQuorum,
                quorum_lost: false,
            };
        }

        QuorumDecision {
            status: NodeStatus::Up,
            quorum_lost: false,
        }
    }

    fn domain_policy_satisfied(&self, view: &QuorumView) -> bool {
        if self.policy == FailureDomainPolicy::None {
            return true;
        }

        let mut member_domains: HashSet<&str> = HashSet::new();
        let mut up_domains: HashSet<&str> = HashSet::new();
        for info in view.nodes.values() {
            if !info.quorum_member {
                continue;
            }
            member_domains.insert(info.cluster_domain.as_str());
            if info.id == view.self_id || info.status == NodeStatus::Up {
                up_domains.insert(info.cluster_domain.as_str());
            }
        }

        match self.policy {
            FailureDomainPolicy::None => true,
            FailureDomainPolicy::MajorityDomains => up_domains.len() > member_domains.len() / 2,
            FailureDomainPolicy::AllDomains => up_domains.len() == member_domains.len(),
        }
    }

    /// Evaluate against the store and write the outcome back: stamps the
    /// lost-quorum timestamp on an UP -> NOT_IN_QUORUM transition and
    /// updates the self status. Returns the new status.
    pub fn apply(&self, store: &GossipStore) -> NodeStatus {
        let view = QuorumView {
            self_id: store.node_id().clone(),
            self_status: store.get_self_status(),
            cluster_size: store.cluster_size(),
            nodes: store.get_local_state(),
            lost_quorum_ts: store.lost_quorum_ts(),
        };
        let decision = self.evaluate(&view, now_ts());

        if decision.quorum_lost {
            store.update_lost_quorum_ts();
            info!("Lost cluster quorum, marking self not in quorum");
        }
        if decision.status != view.self_status {
            if decision.status == NodeStatus::Up {
                info!("Cluster quorum attained, marking self up");
            }
            store.update_self_status(decision.status);
        }
        decision.status
    }
}
