//! Failure-domain index: domain label -> member node ids
//!
//! Secondary index kept in sync with the node map by every store
//! mutation that touches a node's domain. Guarded by its own mutex;
//! when both locks are held the store lock is always taken first.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::types::NodeId;

/// Index from failure-domain label to the set of nodes in that domain
#[derive(Debug, Default)]
pub struct FailureDomainIndex {
    domains: Mutex<HashMap<String, HashSet<NodeId>>>,
}

impl FailureDomainIndex {
    pub fn new() -> Self {
        FailureDomainIndex::default()
    }

    /// Place `id` in `domain`, removing it from any other bucket first.
    /// A node is in at most one bucket at any time.
    pub(crate) fn update(&self, domain: &str, id: &NodeId) {
        let mut domains = self.domains.lock().unwrap();
        for (label, members) in domains.iter_mut() {
            if label != domain {
                members.remove(id);
            }
        }
        domains
            .entry(domain.to_string())
            .or_default()
            .insert(id.clone());
    }

    /// Drop `id` from every bucket
    pub(crate) fn remove(&self, id: &NodeId) {
        let mut domains = self.domains.lock().unwrap();
        for members in domains.values_mut() {
            members.remove(id);
        }
    }

    /// Reset the index
    pub(crate) fn clear(&self) {
        self.domains.lock().unwrap().clear();
    }

    /// Snapshot of one domain's membership
    pub fn nodes_in(&self, domain: &str) -> HashSet<NodeId> {
        self.domains
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the whole index
    pub fn snapshot(&self) -> HashMap<String, HashSet<NodeId>> {
        self.domains.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_lookup() {
        let index = FailureDomainIndex::new();
        index.update("rack-a", &NodeId::new("n1"));
        index.update("rack-a", &NodeId::new("n2"));
        index.update("rack-b", &NodeId::new("n3"));

        assert_eq!(index.nodes_in("rack-a").len(), 2);
        assert!(index.nodes_in("rack-b").contains(&NodeId::new("n3")));
        assert!(index.nodes_in("rack-c").is_empty());
    }

    #[test]
    fn test_domain_change_moves_node() {
        let index = FailureDomainIndex::new();
        let id = NodeId::new("n1");
        index.update("rack-a", &id);
        index.update("rack-b", &id);

        assert!(!index.nodes_in("rack-a").contains(&id));
        assert!(index.nodes_in("rack-b").contains(&id));

        // A node never appears in two buckets.
        let buckets_with_n1 = index
            .snapshot()
            .values()
            .filter(|members| members.contains(&id))
            .count();
        assert_eq!(buckets_with_n1, 1);
    }

    #[test]
    fn test_update_is_idempotent() {
        let index = FailureDomainIndex::new();
        let id = NodeId::new("n1");
        index.update("rack-a", &id);
        index.update("rack-a", &id);
        assert_eq!(index.nodes_in("rack-a").len(), 1);
    }

    #[test]
    fn test_remove() {
        let index = FailureDomainIndex::new();
        let id = NodeId::new("n1");
        index.update("rack-a", &id);
        index.remove(&id);
        assert!(index.nodes_in("rack-a").is_empty());
    }
}
