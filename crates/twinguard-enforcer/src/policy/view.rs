//! JSON view building: filter a document down to what a requester may see.
//!
//! Rules, per node at the current path:
//! - leaf: kept iff the decision at its path is ALLOW.
//! - object/array with ALLOW: every child is re-checked recursively; the
//!   node is kept even when no child survives.
//! - object/array with DENY: kept only if some declared path below it is
//!   granted to a matching entry (reachable), and then only with its
//!   surviving children; dropped if none survive.
//!
//! Object members keep their input order. Array elements are addressed by
//! decimal index; denied elements are removed and the survivors close up.

use serde_json::{Map, Value};
use twinguard_core::model::Permission;

use super::index::{Cursor, EntryMask};

pub(crate) struct ViewBuilder<'a> {
    mask: &'a EntryMask,
    permission: Permission,
}

impl<'a> ViewBuilder<'a> {
    pub(crate) fn new(mask: &'a EntryMask, permission: Permission) -> Self {
        Self { mask, permission }
    }

    /// Project `value`, which lives at the position described by `cursor`.
    pub(crate) fn project(&self, value: &Value, cursor: &Cursor<'_>) -> Option<Value> {
        let allowed = cursor.decision().is_allowed();
        match value {
            Value::Object(members) => {
                if !allowed && !cursor.has_granted_descendant(self.mask, self.permission) {
                    return None;
                }
                let mut out = Map::new();
                for (k, v) in members {
                    let child = cursor.descend(k, self.mask, self.permission);
                    if let Some(p) = self.project(v, &child) {
                        out.insert(k.clone(), p);
                    }
                }
                keep_composite(allowed, out.is_empty()).then_some(Value::Object(out))
            }
            Value::Array(items) => {
                if !allowed && !cursor.has_granted_descendant(self.mask, self.permission) {
                    return None;
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, v) in items.iter().enumerate() {
                    let child = cursor.descend(&i.to_string(), self.mask, self.permission);
                    if let Some(p) = self.project(v, &child) {
                        out.push(p);
                    }
                }
                keep_composite(allowed, out.is_empty()).then_some(Value::Array(out))
            }
            leaf => allowed.then(|| leaf.clone()),
        }
    }
}

// Explicitly granted composites survive empty; merely reachable ones do not.
fn keep_composite(allowed: bool, empty: bool) -> bool {
    allowed || !empty
}
