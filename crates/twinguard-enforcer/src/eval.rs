//! Line-oriented evaluation requests (JSON in, JSON out).
//!
//! ```json
//! {"op":"decide","subjects":["google:alice"],"resource":"thing:/features","permission":"READ"}
//! {"op":"view","subjects":["google:alice"],"resourceType":"thing","document":{"features":{}}}
//! ```
//!
//! Validation failures are answered with `{"error":{"code":..,"message":..}}`,
//! never with a negative decision.

use serde::Deserialize;
use serde_json::{json, Value};

use twinguard_core::error::{Result, TwinGuardError};
use twinguard_core::model::{AuthorizationContext, Permission, ResourceKey};

use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum EvalRequest {
    #[serde(rename_all = "camelCase")]
    Decide {
        #[serde(default)]
        subjects: Vec<String>,
        resource: String,
        #[serde(default)]
        permission: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Reachable {
        #[serde(default)]
        subjects: Vec<String>,
        resource: String,
        #[serde(default)]
        permission: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    View {
        #[serde(default)]
        subjects: Vec<String>,
        resource_type: String,
        #[serde(default)]
        permission: Option<String>,
        document: Value,
    },
    #[serde(rename_all = "camelCase")]
    Subjects {
        resource: String,
        #[serde(default)]
        permission: Option<String>,
    },
}

/// Evaluate one request line; always yields a response object.
pub fn evaluate_line(state: &AppState, line: &str) -> Value {
    match evaluate(state, line) {
        Ok(v) => v,
        Err(e) => {
            state.metrics().record_rejection(e.client_code().as_str());
            json!({ "error": { "code": e.client_code().as_str(), "message": e.to_string() } })
        }
    }
}

fn evaluate(state: &AppState, line: &str) -> Result<Value> {
    let req: EvalRequest = serde_json::from_str(line)
        .map_err(|e| TwinGuardError::BadRequest(format!("invalid request: {e}")))?;
    let enforcer = state.enforcer();
    let metrics = state.metrics();

    match req {
        EvalRequest::Decide { subjects, resource, permission } => {
            let ctx = AuthorizationContext::from_ids(subjects)?;
            let key = resource_key(state, &resource)?;
            let permission = permission_or_default(state, permission)?;
            let allowed = enforcer.has_permission(&key, &ctx, permission);
            metrics.record_decision(permission.as_str(), allowed);
            Ok(json!({ "allowed": allowed }))
        }
        EvalRequest::Reachable { subjects, resource, permission } => {
            let ctx = AuthorizationContext::from_ids(subjects)?;
            let key = resource_key(state, &resource)?;
            let permission = permission_or_default(state, permission)?;
            Ok(json!({ "reachable": enforcer.has_partial_permission(&key, &ctx, permission) }))
        }
        EvalRequest::View { subjects, resource_type, permission, document } => {
            let ctx = AuthorizationContext::from_ids(subjects)?;
            state.limits().check_type(&resource_type)?;
            let permission = permission_or_default(state, permission)?;
            let view = enforcer.build_json_view(&document, &resource_type, &ctx, permission);
            metrics.record_view(match &view {
                Some(v) if *v == document => "full",
                Some(_) => "partial",
                None => "empty",
            });
            Ok(json!({ "view": view }))
        }
        EvalRequest::Subjects { resource, permission } => {
            let key = resource_key(state, &resource)?;
            let permission = permission_or_default(state, permission)?;
            let subjects: Vec<String> = enforcer
                .subjects_with_permission(&key, permission)
                .into_iter()
                .map(String::from)
                .collect();
            Ok(json!({ "subjects": subjects }))
        }
    }
}

fn resource_key(state: &AppState, raw: &str) -> Result<ResourceKey> {
    state.limits().parse_key(raw)
}

fn permission_or_default(state: &AppState, raw: Option<String>) -> Result<Permission> {
    match raw {
        Some(name) => name.parse(),
        None => Ok(state.default_permission()),
    }
}
