//! Compiled per-policy lookup structure.
//!
//! One path trie per resource type. Each trie node holds the statements every
//! entry makes at exactly that path. Resolution walks the trie from the root
//! toward the target, letting deeper statements of an entry replace shallower
//! ones, which yields the "nearest explicit statement wins, per entry" rule in
//! one pass.

use std::collections::HashMap;

use twinguard_core::model::{AuthorizationContext, Permission, Permissions, Policy, ResourcePath, Subject};

use super::matcher;

/// Effect one entry's nearest statement has on a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Grant,
    Revoke,
}

/// Aggregated outcome over all matching entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Statement {
    entry: usize,
    granted: Permissions,
    revoked: Permissions,
}

impl Statement {
    fn effect(&self, permission: Permission) -> Option<Effect> {
        if self.revoked.contains(permission) {
            Some(Effect::Revoke)
        } else if self.granted.contains(permission) {
            Some(Effect::Grant)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PathNode {
    children: HashMap<String, PathNode>,
    statements: Vec<Statement>,
}

impl PathNode {
    pub(crate) fn child(&self, segment: &str) -> Option<&PathNode> {
        self.children.get(segment)
    }

    fn is_declared(&self) -> bool {
        !self.statements.is_empty()
    }
}

/// Which entries apply to the current requester (by entry position).
#[derive(Debug, Clone)]
pub(crate) struct EntryMask(Vec<bool>);

impl EntryMask {
    fn contains(&self, entry: usize) -> bool {
        self.0.get(entry).copied().unwrap_or(false)
    }

    pub(crate) fn any(&self) -> bool {
        self.0.iter().any(|m| *m)
    }
}

/// Per-entry resolution state at one path, for one permission.
///
/// `None` is NO_DECISION. Entries outside the mask stay `None`.
#[derive(Debug, Clone)]
pub(crate) struct EntryStates(Vec<Option<Effect>>);

impl EntryStates {
    fn new(len: usize) -> Self {
        Self(vec![None; len])
    }

    fn apply(&mut self, node: &PathNode, mask: &EntryMask, permission: Permission) {
        for st in &node.statements {
            if !mask.contains(st.entry) {
                continue;
            }
            if let Some(effect) = st.effect(permission) {
                if let Some(slot) = self.0.get_mut(st.entry) {
                    *slot = Some(effect);
                }
            }
        }
    }

    /// Any revoke wins, then any grant, else closed-world deny.
    pub(crate) fn decision(&self) -> Decision {
        if self.0.iter().any(|s| *s == Some(Effect::Revoke)) {
            return Decision::Deny;
        }
        if self.0.iter().any(|s| *s == Some(Effect::Grant)) {
            return Decision::Allow;
        }
        Decision::Deny
    }

    fn any_grant(&self) -> bool {
        self.0.iter().any(|s| *s == Some(Effect::Grant))
    }

    pub(crate) fn effect_of(&self, entry: usize) -> Option<Effect> {
        self.0.get(entry).copied().flatten()
    }
}

/// Position reached while walking down a trie: the node at the current path
/// (absent once the path leaves every declared resource) and the entry states.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    pub(crate) node: Option<&'a PathNode>,
    pub(crate) states: EntryStates,
}

impl<'a> Cursor<'a> {
    /// Step into a child segment, applying that node's statements.
    pub(crate) fn descend(&self, segment: &str, mask: &EntryMask, permission: Permission) -> Cursor<'a> {
        let node = self.node.and_then(|n| n.child(segment));
        let mut states = self.states.clone();
        if let Some(n) = node {
            states.apply(n, mask, permission);
        }
        Cursor { node, states }
    }

    pub(crate) fn decision(&self) -> Decision {
        self.states.decision()
    }

    /// Does any declared path strictly below this one resolve to a grant for
    /// some matching entry?
    pub(crate) fn has_granted_descendant(&self, mask: &EntryMask, permission: Permission) -> bool {
        let Some(node) = self.node else { return false };
        let mut stack: Vec<(&PathNode, EntryStates)> = node
            .children
            .values()
            .map(|c| (c, self.states.clone()))
            .collect();

        while let Some((n, mut states)) = stack.pop() {
            states.apply(n, mask, permission);
            if n.is_declared() && states.any_grant() {
                return true;
            }
            stack.extend(n.children.values().map(|c| (c, states.clone())));
        }
        false
    }

    /// Does every declared path strictly below this one aggregate to ALLOW?
    pub(crate) fn all_descendants_allowed(&self, mask: &EntryMask, permission: Permission) -> bool {
        let Some(node) = self.node else { return true };
        let mut stack: Vec<(&PathNode, EntryStates)> = node
            .children
            .values()
            .map(|c| (c, self.states.clone()))
            .collect();

        while let Some((n, mut states)) = stack.pop() {
            states.apply(n, mask, permission);
            if n.is_declared() && !states.decision().is_allowed() {
                return false;
            }
            stack.extend(n.children.values().map(|c| (c, states.clone())));
        }
        true
    }
}

/// Trie forest compiled from one policy snapshot.
#[derive(Debug, Default)]
pub(crate) struct PolicyIndex {
    trees: HashMap<String, PathNode>,
    entry_subjects: Vec<Vec<Subject>>,
    labels: Vec<String>,
}

impl PolicyIndex {
    pub(crate) fn compile(policy: &Policy) -> Self {
        let mut trees: HashMap<String, PathNode> = HashMap::new();
        let mut entry_subjects = Vec::with_capacity(policy.entries().len());
        let mut labels = Vec::with_capacity(policy.entries().len());

        for (entry, e) in policy.entries().iter().enumerate() {
            for r in e.resources() {
                let root = trees.entry(r.key().resource_type().to_string()).or_default();
                let node = r
                    .key()
                    .path()
                    .segments()
                    .iter()
                    .fold(root, |n, seg| n.children.entry(seg.clone()).or_default());
                node.statements.push(Statement {
                    entry,
                    granted: r.granted(),
                    revoked: r.revoked(),
                });
            }
            entry_subjects.push(e.subjects().to_vec());
            labels.push(e.label().to_string());
        }

        Self { trees, entry_subjects, labels }
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn label(&self, entry: usize) -> &str {
        self.labels.get(entry).map(String::as_str).unwrap_or("?")
    }

    /// Entries whose subjects intersect the context.
    pub(crate) fn mask(&self, ctx: &AuthorizationContext) -> EntryMask {
        EntryMask(
            self.entry_subjects
                .iter()
                .map(|subjects| matcher::matches(subjects, ctx))
                .collect(),
        )
    }

    /// Mask of every entry naming `subject`.
    pub(crate) fn mask_for_subject(&self, subject: &Subject) -> EntryMask {
        EntryMask(
            self.entry_subjects
                .iter()
                .map(|subjects| subjects.contains(subject))
                .collect(),
        )
    }

    /// Cursor at the root of a resource type, root statements applied.
    pub(crate) fn root_cursor(&self, resource_type: &str, mask: &EntryMask, permission: Permission) -> Cursor<'_> {
        let node = self.trees.get(resource_type);
        let mut states = EntryStates::new(self.entry_count());
        if let Some(n) = node {
            states.apply(n, mask, permission);
        }
        Cursor { node, states }
    }

    /// Cursor at `path`, having applied every ancestor's statements on the way.
    pub(crate) fn cursor_at(
        &self,
        resource_type: &str,
        path: &ResourcePath,
        mask: &EntryMask,
        permission: Permission,
    ) -> Cursor<'_> {
        path.segments()
            .iter()
            .fold(self.root_cursor(resource_type, mask, permission), |c, seg| {
                c.descend(seg, mask, permission)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinguard_core::model::{PolicyEntry, Resource, ResourceKey};

    fn perms(p: &[Permission]) -> Permissions {
        p.iter().copied().collect()
    }

    fn policy() -> Policy {
        let alice = Subject::new("google:alice").unwrap();
        let entry = PolicyEntry::new(
            "features",
            [alice],
            [
                Resource::new(
                    ResourceKey::parse("thing:/features").unwrap(),
                    perms(&[Permission::Read]),
                    Permissions::none(),
                )
                .unwrap(),
                Resource::new(
                    ResourceKey::parse("thing:/features/secret").unwrap(),
                    Permissions::none(),
                    perms(&[Permission::Read]),
                )
                .unwrap(),
            ],
        )
        .unwrap();
        Policy::new("ns:p", [entry]).unwrap()
    }

    #[test]
    fn cursor_leaves_trie_but_keeps_inherited_state() {
        let idx = PolicyIndex::compile(&policy());
        let ctx = AuthorizationContext::from_ids(["google:alice"]).unwrap();
        let mask = idx.mask(&ctx);

        let path = ResourcePath::parse("/features/f1/properties/x").unwrap();
        let c = idx.cursor_at("thing", &path, &mask, Permission::Read);
        assert!(c.node.is_none());
        assert_eq!(c.decision(), Decision::Allow);
        assert_eq!(c.states.effect_of(0), Some(Effect::Grant));
    }

    #[test]
    fn root_has_granted_descendant_but_features_is_restricted() {
        let idx = PolicyIndex::compile(&policy());
        let ctx = AuthorizationContext::from_ids(["google:alice"]).unwrap();
        let mask = idx.mask(&ctx);

        let root = idx.root_cursor("thing", &mask, Permission::Read);
        assert_eq!(root.decision(), Decision::Deny);
        assert!(root.has_granted_descendant(&mask, Permission::Read));

        let features = root.descend("features", &mask, Permission::Read);
        assert!(!features.all_descendants_allowed(&mask, Permission::Read));
    }

    #[test]
    fn unknown_type_has_no_tree() {
        let idx = PolicyIndex::compile(&policy());
        let ctx = AuthorizationContext::from_ids(["google:alice"]).unwrap();
        let mask = idx.mask(&ctx);
        let c = idx.root_cursor("policy", &mask, Permission::Read);
        assert!(c.node.is_none());
        assert!(!c.has_granted_descendant(&mask, Permission::Read));
    }
}
