//! JSON representation of a policy.
//!
//! ```json
//! { "policyId": "ns:policy", "_revision": 3,
//!   "entries": { "<label>": {
//!       "subjects":  { "google:alice": { "type": "user" } },
//!       "resources": { "thing:/features": { "grant": ["READ"], "revoke": [] } } } } }
//! ```
//!
//! Objects are read as ordered key/value lists so that a repeated label,
//! subject, or resource key reaches the model constructors and fails as
//! `MalformedPolicy` instead of being silently collapsed. That only holds
//! when parsing from text: a `serde_json::Value` has already merged duplicates.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use crate::error::{Result, TwinGuardError};
use crate::model::permission::Permissions;
use crate::model::policy::{Policy, PolicyEntry};
use crate::model::resource::{Resource, ResourceKey};
use crate::model::subject::Subject;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDoc {
    #[serde(rename = "policyId")]
    policy_id: String,
    #[serde(rename = "_revision", default)]
    revision: Option<u64>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    entries: Vec<(String, EntryDoc)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryDoc {
    #[serde(default, deserialize_with = "ordered_pairs")]
    subjects: Vec<(String, SubjectDoc)>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    resources: Vec<(String, ResourceDoc)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubjectDoc {
    // Free-text description; not used for matching.
    #[serde(rename = "type", default)]
    #[allow(dead_code)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDoc {
    #[serde(default)]
    grant: Vec<String>,
    #[serde(default)]
    revoke: Vec<String>,
}

fn ordered_pairs<'de, D, V>(d: D) -> std::result::Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((k, v)) = map.next_entry::<String, V>()? {
                out.push((k, v));
            }
            Ok(out)
        }
    }

    d.deserialize_map(PairsVisitor(PhantomData))
}

/// Parse and validate a policy from JSON text.
pub fn parse_policy(s: &str) -> Result<Policy> {
    let doc: PolicyDoc = serde_json::from_str(s)
        .map_err(|e| TwinGuardError::BadRequest(format!("invalid policy json: {e}")))?;
    build(doc)
}

/// Parse and validate a policy from an already-parsed JSON value.
pub fn policy_from_value(v: Value) -> Result<Policy> {
    let doc: PolicyDoc = serde_json::from_value(v)
        .map_err(|e| TwinGuardError::BadRequest(format!("invalid policy json: {e}")))?;
    build(doc)
}

fn build(doc: PolicyDoc) -> Result<Policy> {
    let mut entries = Vec::with_capacity(doc.entries.len());
    for (label, e) in doc.entries {
        let subjects = e
            .subjects
            .into_iter()
            .map(|(id, _)| Subject::new(id))
            .collect::<Result<Vec<_>>>()?;

        let mut resources = Vec::with_capacity(e.resources.len());
        for (key, r) in e.resources {
            let key = ResourceKey::parse(&key)?;
            let granted = Permissions::parse(&r.grant)?;
            let revoked = Permissions::parse(&r.revoke)?;
            resources.push(Resource::new(key, granted, revoked)?);
        }

        entries.push(PolicyEntry::new(label, subjects, resources)?);
    }

    let policy = Policy::new(doc.policy_id, entries)?;
    tracing::debug!(
        policy_id = %policy.id(),
        revision = ?doc.revision,
        entries = policy.entries().len(),
        "policy parsed"
    );
    Ok(match doc.revision {
        Some(rev) => policy.with_revision(rev),
        None => policy,
    })
}

/// Render a policy in the wire shape, preserving entry and statement order.
pub fn policy_to_value(policy: &Policy) -> Value {
    let mut entries = Map::new();
    for e in policy.entries() {
        let mut subjects = Map::new();
        for s in e.subjects() {
            subjects.insert(s.to_string(), json!({}));
        }
        let mut resources = Map::new();
        for r in e.resources() {
            resources.insert(
                r.key().to_string(),
                json!({
                    "grant": r.granted().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
                    "revoke": r.revoked().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
                }),
            );
        }
        entries.insert(
            e.label().to_string(),
            json!({ "subjects": subjects, "resources": resources }),
        );
    }

    let mut out = Map::new();
    out.insert("policyId".into(), Value::String(policy.id().to_string()));
    if let Some(rev) = policy.revision() {
        out.insert("_revision".into(), json!(rev));
    }
    out.insert("entries".into(), Value::Object(entries));
    Value::Object(out)
}
