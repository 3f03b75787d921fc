//! Shared application state for the evaluation binary.
//!
//! Holds the validated config, the compiled enforcer for the configured
//! policy, boundary key limits, and metrics. Construction returns `Result`
//! so `main` can report errors instead of panicking.

use std::fs;
use std::sync::Arc;

use twinguard_core::error::{Result, TwinGuardError};
use twinguard_core::model::{wire, KeyLimits, Permission, Policy};

use crate::config::EnforcerConfig;
use crate::obs::EnforcerMetrics;
use crate::policy::PolicyEnforcer;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    enforcer: Arc<PolicyEnforcer>,
    metrics: Arc<EnforcerMetrics>,
}

struct AppStateInner {
    cfg: EnforcerConfig,
    limits: KeyLimits,
    default_permission: Permission,
}

impl AppState {
    /// Build state from config, reading the policy file it names.
    pub fn from_config(cfg: EnforcerConfig) -> Result<Self> {
        let path = cfg
            .enforcer
            .policy_file
            .clone()
            .ok_or_else(|| TwinGuardError::BadRequest("enforcer.policy_file is required".into()))?;
        let raw = fs::read_to_string(&path)
            .map_err(|e| TwinGuardError::Internal(format!("read policy file {path} failed: {e}")))?;
        let policy = wire::parse_policy(&raw)?;
        Self::new(cfg, &policy)
    }

    /// Build state around an already-validated policy.
    pub fn new(cfg: EnforcerConfig, policy: &Policy) -> Result<Self> {
        let limits = cfg.enforcer.key_limits();
        let default_permission = cfg.enforcer.default_permission()?;

        for e in policy.entries() {
            for r in e.resources() {
                if limits.check_type(r.key().resource_type()).is_err() {
                    tracing::warn!(
                        label = %e.label(),
                        resource = %r.key(),
                        "policy resource uses a type not accepted in requests"
                    );
                }
            }
        }

        let enforcer = Arc::new(PolicyEnforcer::new(policy));
        tracing::info!(policy_id = %policy.id(), "policy loaded");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                limits,
                default_permission,
            }),
            enforcer,
            metrics: Arc::new(EnforcerMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &EnforcerConfig {
        &self.inner.cfg
    }

    pub fn limits(&self) -> &KeyLimits {
        &self.inner.limits
    }

    pub fn default_permission(&self) -> Permission {
        self.inner.default_permission
    }

    pub fn enforcer(&self) -> Arc<PolicyEnforcer> {
        Arc::clone(&self.enforcer)
    }

    pub fn metrics(&self) -> Arc<EnforcerMetrics> {
        Arc::clone(&self.metrics)
    }
}
