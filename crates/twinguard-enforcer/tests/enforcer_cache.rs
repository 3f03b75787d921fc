#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use twinguard_core::model::{wire, AuthorizationContext, Permission, Permissions, ResourceKey, Subject};
use twinguard_enforcer::{matches, EnforcerCache, PolicyEnforcer};

fn policy(id: &str, revision: Option<u64>, grant: &str) -> twinguard_core::model::Policy {
    let rev = revision.map(|r| format!(r#""_revision": {r},"#)).unwrap_or_default();
    wire::parse_policy(&format!(
        r#"{{ "policyId": "{id}", {rev}
             "entries": {{ "e": {{ "subjects": {{ "google:alice": {{}} }},
                                  "resources": {{ "thing:/": {{ "grant": ["{grant}"] }} }} }} }} }}"#
    ))
    .unwrap()
}

fn alice() -> AuthorizationContext {
    AuthorizationContext::from_ids(["google:alice"]).unwrap()
}

#[test]
fn same_revision_reuses_the_compiled_enforcer() {
    let cache = EnforcerCache::new(8);
    let a = cache.get_or_compile(&policy("ns:p", Some(1), "READ"));
    let b = cache.get_or_compile(&policy("ns:p", Some(1), "READ"));
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn new_revision_recompiles() {
    let cache = EnforcerCache::new(8);
    let root = ResourceKey::parse("thing:/").unwrap();

    let v1 = cache.get_or_compile(&policy("ns:p", Some(1), "READ"));
    assert!(v1.has_permission(&root, &alice(), Permission::Read));

    let v2 = cache.get_or_compile(&policy("ns:p", Some(2), "WRITE"));
    assert!(!Arc::ptr_eq(&v1, &v2));
    assert_eq!(v2.revision(), Some(2));
    assert!(!v2.has_permission(&root, &alice(), Permission::Read));
    assert!(v2.has_permission(&root, &alice(), Permission::Write));
    assert_eq!(cache.len(), 1);
}

#[test]
fn unrevisioned_policies_are_never_cached() {
    let cache = EnforcerCache::new(8);
    let a = cache.get_or_compile(&policy("ns:p", None, "READ"));
    let b = cache.get_or_compile(&policy("ns:p", None, "READ"));
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(cache.is_empty());
}

#[test]
fn capacity_is_bounded() {
    let cache = EnforcerCache::new(2);
    for i in 0..5 {
        cache.get_or_compile(&policy(&format!("ns:p{i}"), Some(1), "READ"));
    }
    assert_eq!(cache.len(), 2);

    cache.invalidate("ns:p4");
    assert!(cache.len() <= 1);
}

#[test]
fn permission_sets_need_every_member() {
    let enforcer = PolicyEnforcer::new(&policy("ns:p", None, "READ"));
    let root = ResourceKey::parse("thing:/").unwrap();
    let read = Permissions::parse(["READ"]).unwrap();
    let both = Permissions::parse(["READ", "WRITE"]).unwrap();

    assert!(enforcer.has_permissions(&root, &alice(), read));
    assert!(!enforcer.has_permissions(&root, &alice(), both));
    assert!(!enforcer.has_permissions(&root, &alice(), Permissions::none()));
}

#[test]
fn matching_is_exact() {
    let entry = [Subject::new("google:alice").unwrap(), Subject::new("group:ops").unwrap()];
    assert!(matches(&entry, &alice()));
    assert!(matches(&entry, &AuthorizationContext::from_ids(["x:y", "group:ops"]).unwrap()));
    assert!(!matches(&entry, &AuthorizationContext::from_ids(["google:Alice", "google:"]).unwrap()));
    assert!(!matches(&entry, &AuthorizationContext::default()));
    assert!(!matches(&[], &alice()));
}
