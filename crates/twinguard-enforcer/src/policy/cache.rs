//! Memo of compiled enforcers, keyed by policy id.
//!
//! A cached enforcer is reused only for a policy carrying the same revision;
//! a policy without a revision is compiled on every request. Decisions are
//! identical with or without the cache.

use std::sync::Arc;

use dashmap::DashMap;
use twinguard_core::model::Policy;

use super::engine::PolicyEnforcer;

pub struct EnforcerCache {
    map: DashMap<String, Arc<PolicyEnforcer>>,
    capacity: usize,
}

impl EnforcerCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cached enforcer for this policy snapshot, compiling it if needed.
    pub fn get_or_compile(&self, policy: &Policy) -> Arc<PolicyEnforcer> {
        let Some(revision) = policy.revision() else {
            return Arc::new(PolicyEnforcer::new(policy));
        };

        if let Some(hit) = self.map.get(policy.id()) {
            if hit.revision() == Some(revision) {
                return Arc::clone(hit.value());
            }
        }

        let compiled = Arc::new(PolicyEnforcer::new(policy));
        if !self.map.contains_key(policy.id()) && self.map.len() >= self.capacity {
            self.evict_one();
        }
        self.map.insert(policy.id().to_string(), Arc::clone(&compiled));
        tracing::info!(policy_id = %policy.id(), revision, "enforcer cached");
        compiled
    }

    /// Drop the cached enforcer of a policy (e.g. after it was deleted).
    pub fn invalidate(&self, policy_id: &str) {
        self.map.remove(policy_id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn evict_one(&self) {
        // Take the key first: removing while an iterator guard is alive deadlocks.
        let victim = self.map.iter().next().map(|e| e.key().clone());
        if let Some(k) = victim {
            self.map.remove(&k);
            tracing::debug!(policy_id = %k, "enforcer evicted");
        }
    }
}
