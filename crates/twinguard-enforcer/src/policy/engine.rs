use std::collections::BTreeSet;

use serde_json::Value;
use twinguard_core::model::{
    AuthorizationContext, Permission, Permissions, Policy, ResourceKey, Subject,
};

pub use super::index::Decision;
use super::index::{EntryMask, PolicyIndex};
use super::view::ViewBuilder;

/// Policy-scoped enforcer runtime.
/// Construct once per policy snapshot, then share via Arc.
///
/// Every query is a pure function of the compiled snapshot and its
/// arguments; nothing is mutated after construction.
#[derive(Debug)]
pub struct PolicyEnforcer {
    policy_id: String,
    revision: Option<u64>,
    index: PolicyIndex,
    subjects: BTreeSet<Subject>,
}

impl PolicyEnforcer {
    pub fn new(policy: &Policy) -> Self {
        let index = PolicyIndex::compile(policy);
        tracing::debug!(
            policy_id = %policy.id(),
            entries = index.entry_count(),
            "policy enforcer compiled"
        );
        Self {
            policy_id: policy.id().to_string(),
            revision: policy.revision(),
            index,
            subjects: policy.subjects(),
        }
    }

    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Effective decision for one permission at one resource.
    pub fn decide(&self, key: &ResourceKey, ctx: &AuthorizationContext, permission: Permission) -> Decision {
        let mask = self.index.mask(ctx);
        self.decide_masked(key, &mask, permission)
    }

    fn decide_masked(&self, key: &ResourceKey, mask: &EntryMask, permission: Permission) -> Decision {
        if !mask.any() {
            tracing::debug!(policy_id = %self.policy_id, %key, %permission, "no matching entry");
            return Decision::Deny;
        }
        let cursor = self
            .index
            .cursor_at(key.resource_type(), key.path(), mask, permission);
        if tracing::enabled!(tracing::Level::TRACE) {
            for entry in 0..self.index.entry_count() {
                if let Some(effect) = cursor.states.effect_of(entry) {
                    tracing::trace!(label = %self.index.label(entry), ?effect, %key, "entry resolved");
                }
            }
        }
        let decision = cursor.decision();
        tracing::debug!(
            policy_id = %self.policy_id,
            %key,
            %permission,
            decision = decision.as_str(),
            "decided"
        );
        decision
    }

    /// Permission is granted at `key` itself (inherited or explicit, not revoked).
    pub fn has_permission(&self, key: &ResourceKey, ctx: &AuthorizationContext, permission: Permission) -> bool {
        self.decide(key, ctx, permission).is_allowed()
    }

    /// Granted at `key` and at every declared path below it; required before a
    /// write that replaces the whole subtree.
    pub fn has_unrestricted_permission(
        &self,
        key: &ResourceKey,
        ctx: &AuthorizationContext,
        permission: Permission,
    ) -> bool {
        let mask = self.index.mask(ctx);
        let cursor = self
            .index
            .cursor_at(key.resource_type(), key.path(), &mask, permission);
        cursor.decision().is_allowed() && cursor.all_descendants_allowed(&mask, permission)
    }

    /// Granted at `key`, or at some declared path below it (reachability).
    pub fn has_partial_permission(
        &self,
        key: &ResourceKey,
        ctx: &AuthorizationContext,
        permission: Permission,
    ) -> bool {
        let mask = self.index.mask(ctx);
        self.reachable_masked(key, &mask, permission)
    }

    fn reachable_masked(&self, key: &ResourceKey, mask: &EntryMask, permission: Permission) -> bool {
        let cursor = self
            .index
            .cursor_at(key.resource_type(), key.path(), mask, permission);
        cursor.decision().is_allowed() || cursor.has_granted_descendant(mask, permission)
    }

    /// True iff every permission in `permissions` is granted at `key`.
    /// An empty set is never granted.
    pub fn has_permissions(
        &self,
        key: &ResourceKey,
        ctx: &AuthorizationContext,
        permissions: Permissions,
    ) -> bool {
        if permissions.is_empty() {
            return false;
        }
        let mask = self.index.mask(ctx);
        permissions
            .iter()
            .all(|p| self.decide_masked(key, &mask, p).is_allowed())
    }

    /// Project a whole document of `resource_type` (rooted at `/`).
    pub fn build_json_view(
        &self,
        document: &Value,
        resource_type: &str,
        ctx: &AuthorizationContext,
        permission: Permission,
    ) -> Option<Value> {
        let mask = self.index.mask(ctx);
        let cursor = self.index.root_cursor(resource_type, &mask, permission);
        ViewBuilder::new(&mask, permission).project(document, &cursor)
    }

    /// Project a sub-document that lives at `base` (e.g. a command response).
    pub fn build_json_view_at(
        &self,
        document: &Value,
        base: &ResourceKey,
        ctx: &AuthorizationContext,
        permission: Permission,
    ) -> Option<Value> {
        let mask = self.index.mask(ctx);
        let cursor = self
            .index
            .cursor_at(base.resource_type(), base.path(), &mask, permission);
        ViewBuilder::new(&mask, permission).project(document, &cursor)
    }

    /// Declared subjects that, presented alone, hold `permission` at `key`.
    pub fn subjects_with_permission(&self, key: &ResourceKey, permission: Permission) -> BTreeSet<Subject> {
        self.subjects
            .iter()
            .filter(|s| {
                let mask = self.index.mask_for_subject(s);
                self.decide_masked(key, &mask, permission).is_allowed()
            })
            .cloned()
            .collect()
    }

    /// Declared subjects that, presented alone, can reach `key` for `permission`.
    pub fn subjects_with_partial_permission(
        &self,
        key: &ResourceKey,
        permission: Permission,
    ) -> BTreeSet<Subject> {
        self.subjects
            .iter()
            .filter(|s| {
                let mask = self.index.mask_for_subject(s);
                self.reachable_masked(key, &mask, permission)
            })
            .cloned()
            .collect()
    }
}

/// One-shot decision without keeping the compiled enforcer.
pub fn decide(policy: &Policy, ctx: &AuthorizationContext, key: &ResourceKey, permission: Permission) -> Decision {
    PolicyEnforcer::new(policy).decide(key, ctx, permission)
}

/// One-shot reachability check.
pub fn is_reachable(
    policy: &Policy,
    ctx: &AuthorizationContext,
    key: &ResourceKey,
    permission: Permission,
) -> bool {
    PolicyEnforcer::new(policy).has_partial_permission(key, ctx, permission)
}

/// One-shot projection of a whole document.
pub fn project(
    document: &Value,
    resource_type: &str,
    policy: &Policy,
    ctx: &AuthorizationContext,
    permission: Permission,
) -> Option<Value> {
    PolicyEnforcer::new(policy).build_json_view(document, resource_type, ctx, permission)
}

