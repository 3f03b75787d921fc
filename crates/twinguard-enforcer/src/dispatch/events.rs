//! Event delivery filtering.
//!
//! A subscriber receives a modification event only with the part of its
//! value it may read; deletions are delivered only to subscribers allowed to
//! read the deleted path.

use std::collections::BTreeSet;
use std::sync::Arc;

use twinguard_core::model::{AuthorizationContext, Permission, Subject};
use twinguard_core::signals::ThingEvent;

use crate::policy::PolicyEnforcer;

pub struct EventFilter {
    enforcer: Arc<PolicyEnforcer>,
}

impl EventFilter {
    pub fn new(enforcer: Arc<PolicyEnforcer>) -> Self {
        Self { enforcer }
    }

    /// Declared subjects that should be notified about `event`.
    pub fn readers(&self, event: &ThingEvent) -> BTreeSet<Subject> {
        let key = event.resource_key();
        match event.value() {
            Some(_) => self.enforcer.subjects_with_partial_permission(&key, Permission::Read),
            None => self.enforcer.subjects_with_permission(&key, Permission::Read),
        }
    }

    /// The event as `ctx` may see it, or `None` if it must not be delivered.
    pub fn view_for(&self, event: &ThingEvent, ctx: &AuthorizationContext) -> Option<ThingEvent> {
        let key = event.resource_key();
        match event.value() {
            Some(value) => self
                .enforcer
                .build_json_view_at(value, &key, ctx, Permission::Read)
                .map(|v| event.with_value(v)),
            None => self
                .enforcer
                .has_permission(&key, ctx, Permission::Read)
                .then(|| event.clone()),
        }
    }
}
