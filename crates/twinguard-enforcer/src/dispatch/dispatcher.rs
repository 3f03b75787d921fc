use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use twinguard_core::error::{Result, TwinGuardError};
use twinguard_core::model::{AuthorizationContext, Policy};
use twinguard_core::signals::ThingCommand;

use crate::obs::EnforcerMetrics;
use crate::policy::{EnforcerCache, PolicyEnforcer};

/// Policy store: supplies the materialized policy guarding a thing.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn policy_for(&self, thing_id: &str) -> Result<Arc<Policy>>;
}

/// Executes an already-authorized thing command.
/// Queries return the addressed sub-document; modifications return `None`.
#[async_trait]
pub trait ThingHandler: Send + Sync {
    async fn handle(&self, cmd: &ThingCommand) -> Result<Option<Value>>;
}

/// Authorizes commands against the thing's policy before handing them to the
/// handler, and filters query responses down to what the requester may read.
pub struct EnforcedDispatcher {
    policies: Arc<dyn PolicyProvider>,
    handler: Arc<dyn ThingHandler>,
    cache: EnforcerCache,
    metrics: Arc<EnforcerMetrics>,
}

impl EnforcedDispatcher {
    pub fn new(
        policies: Arc<dyn PolicyProvider>,
        handler: Arc<dyn ThingHandler>,
        cache_capacity: usize,
        metrics: Arc<EnforcerMetrics>,
    ) -> Self {
        Self {
            policies,
            handler,
            cache: EnforcerCache::new(cache_capacity),
            metrics,
        }
    }

    pub fn cache(&self) -> &EnforcerCache {
        &self.cache
    }

    pub async fn dispatch(&self, cmd: &ThingCommand, ctx: &AuthorizationContext) -> Result<Option<Value>> {
        let started = Instant::now();
        let res = self.dispatch_inner(cmd, ctx).await;
        self.metrics
            .dispatch_duration
            .observe(&[("command", cmd.name())], started.elapsed());

        if let Err(e) = &res {
            self.metrics.record_rejection(e.client_code().as_str());
            if e.is_validation() {
                tracing::debug!(command = cmd.name(), error = %e, "invalid command");
            } else {
                tracing::debug!(command = cmd.name(), thing_id = %cmd.thing_id(), error = %e, "command rejected");
            }
        }
        res
    }

    async fn dispatch_inner(&self, cmd: &ThingCommand, ctx: &AuthorizationContext) -> Result<Option<Value>> {
        cmd.validate()?;
        let policy = self.policies.policy_for(cmd.thing_id()).await?;
        let enforcer = self.cache.get_or_compile(&policy);

        if cmd.is_query() {
            self.run_query(&enforcer, cmd, ctx).await
        } else {
            self.run_modify(&enforcer, cmd, ctx).await
        }
    }

    /// Writes replace whole subtrees, so nothing below the path may be revoked.
    async fn run_modify(
        &self,
        enforcer: &PolicyEnforcer,
        cmd: &ThingCommand,
        ctx: &AuthorizationContext,
    ) -> Result<Option<Value>> {
        let key = cmd.resource_key();
        let permission = cmd.required_permission();
        let allowed = enforcer.has_unrestricted_permission(&key, ctx, permission);
        self.metrics.record_decision(permission.as_str(), allowed);
        if !allowed {
            return Err(TwinGuardError::NotAllowed(format!("{permission} on {key}")));
        }
        self.handler.handle(cmd).await
    }

    async fn run_query(
        &self,
        enforcer: &PolicyEnforcer,
        cmd: &ThingCommand,
        ctx: &AuthorizationContext,
    ) -> Result<Option<Value>> {
        let key = cmd.resource_key();
        let permission = cmd.required_permission();
        let allowed = enforcer.has_partial_permission(&key, ctx, permission);
        self.metrics.record_decision(permission.as_str(), allowed);
        if !allowed {
            return Err(TwinGuardError::NotAllowed(format!("{permission} on {key}")));
        }

        let Some(response) = self.handler.handle(cmd).await? else {
            return Ok(None);
        };

        match enforcer.build_json_view_at(&response, &key, ctx, permission) {
            Some(view) => {
                self.metrics
                    .record_view(if view == response { "full" } else { "partial" });
                Ok(Some(view))
            }
            None => {
                self.metrics.record_view("empty");
                Err(TwinGuardError::NotAllowed(format!("{permission} on {key}")))
            }
        }
    }
}
