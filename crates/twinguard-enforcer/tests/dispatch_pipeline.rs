//! Enforced command dispatch over the in-memory stores.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use serde_json::{json, Value};

use twinguard_core::model::{wire, AuthorizationContext, Subject};
use twinguard_core::signals::{ThingCommand, ThingEvent};
use twinguard_enforcer::dispatch::{EnforcedDispatcher, EventFilter, InMemoryPolicies, InMemoryThings};
use twinguard_enforcer::obs::EnforcerMetrics;
use twinguard_enforcer::PolicyEnforcer;

const BOILER: &str = "org.acme:boiler-7";

const POLICY: &str = r#"{
  "policyId": "org.acme:boiler-policy",
  "_revision": 3,
  "entries": {
    "owner": {
      "subjects": { "google:owner": {} },
      "resources": { "thing:/": { "grant": ["READ", "WRITE"] } }
    },
    "reader": {
      "subjects": { "google:alice": {} },
      "resources": {
        "thing:/features": { "grant": ["READ"] },
        "thing:/features/secret": { "revoke": ["READ"] },
        "thing:/attributes/owner": { "grant": ["READ"] },
        "thing:/attributes/location": { "grant": ["WRITE"] },
        "thing:/attributes/location/locked": { "revoke": ["WRITE"] }
      }
    }
  }
}"#;

struct Harness {
    dispatcher: EnforcedDispatcher,
    things: Arc<InMemoryThings>,
    policies: Arc<InMemoryPolicies>,
    metrics: Arc<EnforcerMetrics>,
}

fn boiler_doc() -> Value {
    json!({
        "thingId": BOILER,
        "attributes": { "location": { "lat": 1, "locked": true }, "owner": "acme" },
        "features": {
            "temp": { "properties": { "value": 21 } },
            "secret": { "properties": { "pin": 1234 } }
        }
    })
}

fn harness() -> Harness {
    let policy = Arc::new(wire::parse_policy(POLICY).unwrap());
    let policies = Arc::new(InMemoryPolicies::new());
    policies.insert(BOILER, Arc::clone(&policy));

    let things = Arc::new(InMemoryThings::new());
    things.insert(BOILER, boiler_doc());

    let metrics = Arc::new(EnforcerMetrics::default());
    let dispatcher = EnforcedDispatcher::new(policies.clone(), things.clone(), 8, Arc::clone(&metrics));
    Harness { dispatcher, things, policies, metrics }
}

fn alice() -> AuthorizationContext {
    AuthorizationContext::from_ids(["google:alice"]).unwrap()
}

fn owner() -> AuthorizationContext {
    AuthorizationContext::from_ids(["google:owner"]).unwrap()
}

fn cmd(v: Value) -> ThingCommand {
    ThingCommand::from_json(&v.to_string()).unwrap()
}

#[tokio::test]
async fn query_response_is_filtered() {
    let h = harness();
    let retrieve = cmd(json!({"type": "things.commands:retrieveThing", "thingId": BOILER}));

    let view = h.dispatcher.dispatch(&retrieve, &alice()).await.unwrap();
    assert_eq!(
        view,
        Some(json!({
            "attributes": { "owner": "acme" },
            "features": { "temp": { "properties": { "value": 21 } } }
        }))
    );

    let full = h.dispatcher.dispatch(&retrieve, &owner()).await.unwrap();
    assert_eq!(full, Some(boiler_doc()));

    assert_eq!(h.metrics.views.get(&[("outcome", "partial")]), 1);
    assert_eq!(h.metrics.views.get(&[("outcome", "full")]), 1);
}

#[tokio::test]
async fn sub_document_queries_are_projected_at_their_path() {
    let h = harness();
    let attrs = cmd(json!({"type": "things.commands:retrieveAttributes", "thingId": BOILER}));
    let view = h.dispatcher.dispatch(&attrs, &alice()).await.unwrap();
    assert_eq!(view, Some(json!({ "owner": "acme" })));

    let prop = cmd(json!({
        "type": "things.commands:retrieveFeatureProperty",
        "thingId": BOILER, "featureId": "temp", "property": "/value"
    }));
    assert_eq!(h.dispatcher.dispatch(&prop, &alice()).await.unwrap(), Some(json!(21)));
}

#[tokio::test]
async fn unreachable_queries_are_not_allowed() {
    let h = harness();
    for raw in [
        json!({"type": "things.commands:retrieveFeature", "thingId": BOILER, "featureId": "secret"}),
        json!({"type": "things.commands:retrieveAttribute", "thingId": BOILER, "attribute": "/location"}),
    ] {
        let err = h.dispatcher.dispatch(&cmd(raw.clone()), &alice()).await.unwrap_err();
        assert_eq!(err.client_code().as_str(), "NOT_ALLOWED", "{raw}");
    }

    let stranger = AuthorizationContext::from_ids(["google:mallory"]).unwrap();
    let retrieve = cmd(json!({"type": "things.commands:retrieveThing", "thingId": BOILER}));
    let err = h.dispatcher.dispatch(&retrieve, &stranger).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_ALLOWED");
    assert_eq!(h.metrics.rejections.get(&[("code", "NOT_ALLOWED")]), 3);
}

#[tokio::test]
async fn reachable_but_empty_view_is_not_allowed() {
    let h = harness();
    let shed = "org.acme:shed";
    h.policies.insert(shed, Arc::new(wire::parse_policy(POLICY).unwrap()));
    h.things.insert(shed, json!({ "attributes": { "color": "red" } }));

    let attrs = cmd(json!({"type": "things.commands:retrieveAttributes", "thingId": shed}));
    let err = h.dispatcher.dispatch(&attrs, &alice()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_ALLOWED");
    assert_eq!(h.metrics.views.get(&[("outcome", "empty")]), 1);
}

#[tokio::test]
async fn modification_requires_unrestricted_write() {
    let h = harness();
    let mut events = h.things.subscribe();

    let lat = cmd(json!({
        "type": "things.commands:modifyAttribute",
        "thingId": BOILER, "attribute": "/location/lat", "value": 48
    }));
    assert_eq!(h.dispatcher.dispatch(&lat, &alice()).await.unwrap(), None);
    assert_eq!(h.things.get(BOILER).unwrap()["attributes"]["location"]["lat"], 48);

    let event = events.try_recv().unwrap();
    assert_eq!(event.revision(), 2);
    assert_eq!(event.value(), Some(&json!(48)));

    // Replacing /location would overwrite the locked flag.
    let whole = cmd(json!({
        "type": "things.commands:modifyAttribute",
        "thingId": BOILER, "attribute": "/location", "value": {}
    }));
    let err = h.dispatcher.dispatch(&whole, &alice()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_ALLOWED");

    let locked = cmd(json!({
        "type": "things.commands:deleteAttribute", "thingId": BOILER, "attribute": "/location/locked"
    }));
    let err = h.dispatcher.dispatch(&locked, &alice()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_ALLOWED");

    let temp = cmd(json!({
        "type": "things.commands:deleteFeatureProperty",
        "thingId": BOILER, "featureId": "temp", "property": "/value"
    }));
    let err = h.dispatcher.dispatch(&temp, &alice()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_ALLOWED");

    // Nothing denied was applied.
    let doc = h.things.get(BOILER).unwrap();
    assert_eq!(doc["attributes"]["location"]["locked"], true);
    assert_eq!(doc["features"]["temp"]["properties"]["value"], 21);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn owner_deletes_and_event_revisions_advance() {
    let h = harness();
    let mut events = h.things.subscribe();

    let pin = cmd(json!({
        "type": "things.commands:deleteFeatureProperty",
        "thingId": BOILER, "featureId": "secret", "property": "/pin"
    }));
    h.dispatcher.dispatch(&pin, &owner()).await.unwrap();
    assert_eq!(h.things.get(BOILER).unwrap()["features"]["secret"]["properties"], json!({}));

    let err = h.dispatcher.dispatch(&pin, &owner()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_FOUND");

    let value = cmd(json!({
        "type": "things.commands:modifyFeatureProperty",
        "thingId": BOILER, "featureId": "temp", "property": "/value", "value": 22
    }));
    h.dispatcher.dispatch(&value, &owner()).await.unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert!(matches!(first, ThingEvent::FeaturePropertyDeleted { revision: 2, .. }));
    assert!(matches!(second, ThingEvent::FeaturePropertyModified { revision: 3, .. }));
}

#[tokio::test]
async fn missing_policy_or_thing_is_not_found() {
    let h = harness();
    let unknown = cmd(json!({"type": "things.commands:retrieveThing", "thingId": "org.acme:unknown"}));
    let err = h.dispatcher.dispatch(&unknown, &owner()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_FOUND");

    h.policies
        .insert("org.acme:ghost", Arc::new(wire::parse_policy(POLICY).unwrap()));
    let ghost = cmd(json!({"type": "things.commands:retrieveThing", "thingId": "org.acme:ghost"}));
    let err = h.dispatcher.dispatch(&ghost, &owner()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "NOT_FOUND");
}

#[tokio::test]
async fn invalid_commands_are_rejected_before_authorization() {
    let h = harness();
    let bad = ThingCommand::RetrieveFeature {
        thing_id: BOILER.into(),
        feature_id: "a/b".into(),
    };
    let err = h.dispatcher.dispatch(&bad, &owner()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "INVALID_RESOURCE_KEY");
    assert_eq!(h.metrics.rejections.get(&[("code", "INVALID_RESOURCE_KEY")]), 1);
    assert!(h.dispatcher.cache().is_empty());
}

#[tokio::test]
async fn enforcer_is_compiled_once_per_revision() {
    let h = harness();
    let retrieve = cmd(json!({"type": "things.commands:retrieveThing", "thingId": BOILER}));
    h.dispatcher.dispatch(&retrieve, &owner()).await.unwrap();
    h.dispatcher.dispatch(&retrieve, &alice()).await.unwrap();
    assert_eq!(h.dispatcher.cache().len(), 1);

    let rendered = h.metrics.render();
    assert!(rendered.contains("twinguard_decisions_total"));
    assert!(rendered.contains("twinguard_dispatch_duration_micros_count{command=\"retrieveThing\"} 2"));
}

#[test]
fn event_filter_limits_delivery() {
    let policy = wire::parse_policy(POLICY).unwrap();
    let filter = EventFilter::new(Arc::new(PolicyEnforcer::new(&policy)));
    let owner_subject = Subject::new("google:owner").unwrap();
    let alice_subject = Subject::new("google:alice").unwrap();

    let lat = ThingEvent::from_command(
        &cmd(json!({
            "type": "things.commands:modifyAttribute",
            "thingId": BOILER, "attribute": "/location/lat", "value": 48
        })),
        2,
    )
    .unwrap();
    let readers = filter.readers(&lat);
    assert!(readers.contains(&owner_subject));
    assert!(!readers.contains(&alice_subject));
    assert_eq!(filter.view_for(&lat, &alice()), None);
    assert_eq!(filter.view_for(&lat, &owner()), Some(lat.clone()));

    let props = ThingEvent::from_command(
        &cmd(json!({
            "type": "things.commands:modifyFeatureProperty",
            "thingId": BOILER, "featureId": "temp", "property": "/value", "value": {"c": 21, "f": 70}
        })),
        3,
    )
    .unwrap();
    assert!(filter.readers(&props).contains(&alice_subject));
    assert_eq!(filter.view_for(&props, &alice()), Some(props.clone()));

    let pin = ThingEvent::from_command(
        &cmd(json!({
            "type": "things.commands:deleteFeatureProperty",
            "thingId": BOILER, "featureId": "secret", "property": "/pin"
        })),
        4,
    )
    .unwrap();
    assert_eq!(filter.view_for(&pin, &alice()), None);
    assert_eq!(filter.view_for(&pin, &owner()), Some(pin.clone()));
    assert_eq!(filter.readers(&pin).into_iter().collect::<Vec<_>>(), [owner_subject]);
}
