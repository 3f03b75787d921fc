//! Decision, reachability and view scenarios driven by JSON vectors.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use serde_json::Value;

use twinguard_enforcer::{decide, is_reachable, project, Decision, PolicyEnforcer};
use vector_loader::{ctx, key, permission};

#[test]
fn decisions_and_reachability() {
    for (name, v) in vector_loader::all() {
        let policy = v.policy();
        let enforcer = PolicyEnforcer::new(&policy);

        for c in &v.checks {
            let ctx = ctx(&c.subjects);
            let key = key(&c.resource);
            let perm = permission(&c.permission);
            let what = format!("{name}: {:?} {} on {}", c.subjects, c.permission, c.resource);

            assert_eq!(enforcer.has_permission(&key, &ctx, perm), c.allowed, "{what}");
            let expected = if c.allowed { Decision::Allow } else { Decision::Deny };
            assert_eq!(decide(&policy, &ctx, &key, perm), expected, "{what} (one-shot)");

            if let Some(reachable) = c.reachable {
                assert_eq!(enforcer.has_partial_permission(&key, &ctx, perm), reachable, "{what}: reachable");
                assert_eq!(is_reachable(&policy, &ctx, &key, perm), reachable, "{what}: reachable (one-shot)");
            }
            // An allowed key is always reachable.
            if c.allowed {
                assert!(enforcer.has_partial_permission(&key, &ctx, perm), "{what}");
            }
        }
    }
}

#[test]
fn views() {
    for (name, v) in vector_loader::all() {
        let policy = v.policy();
        let enforcer = PolicyEnforcer::new(&policy);

        for (i, c) in v.views.iter().enumerate() {
            let ctx = ctx(&c.subjects);
            let perm = permission(&c.permission);
            let view = enforcer.build_json_view(&c.document, &c.resource_type, &ctx, perm);
            let expected = match &c.expect {
                Value::Null => None,
                other => Some(other.clone()),
            };
            assert_eq!(view, expected, "{name} view #{i} ({})", v.description);
            assert_eq!(
                project(&c.document, &c.resource_type, &policy, &ctx, perm),
                view,
                "{name} view #{i} (one-shot)"
            );

            // Filtering a filtered view changes nothing.
            if let (Some(once), false) = (&view, c.shifts_indices) {
                let twice = enforcer.build_json_view(once, &c.resource_type, &ctx, perm);
                assert_eq!(twice.as_ref(), Some(once), "{name} view #{i} not idempotent");
            }
        }
    }
}

#[test]
fn subjects_with_permission() {
    for (name, v) in vector_loader::all() {
        let enforcer = PolicyEnforcer::new(&v.policy());

        for c in &v.subjects_with {
            let got: Vec<String> = enforcer
                .subjects_with_permission(&key(&c.resource), permission(&c.permission))
                .into_iter()
                .map(String::from)
                .collect();
            assert_eq!(got, c.expect, "{name}: {} {}", c.permission, c.resource);
        }
    }
}
