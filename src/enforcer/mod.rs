//! Authorization enforcer
//!
//! [`Authorization`] resolves the identity and action for the current
//! request, asks the identity for a decision, and either raises on denial
//! or returns the narrowed resource. Successful checks and explicit skips
//! are recorded on the request's authorization service.
//!
//! # Example
//!
//! ```
//! use komainu::config::AuthorizationConfig;
//! use komainu::context::RequestContext;
//! use komainu::enforcer::Authorization;
//! use komainu::service::{AuthorizationService, AuthorizationState, RequestAuthorization};
//! use std::sync::Arc;
//!
//! let config = AuthorizationConfig::default();
//! let service = Arc::new(RequestAuthorization::new());
//! let ctx = RequestContext::new("login").with_service(&config.service_attribute, service.clone());
//!
//! let authorization = Authorization::new(config);
//! authorization.skip_authorization(&ctx).expect("service present");
//! assert_eq!(service.state(), AuthorizationState::Skipped);
//! ```

use crate::config::AuthorizationConfig;
use crate::context::RequestContext;
use crate::error::{AuthorizationError, AuthorizationResult};
use crate::identity::Identity;
use crate::resource::{inner_resource, short_type_name, Resource};
use crate::service::AuthorizationService;
use std::sync::Arc;
use tracing::info;

/// Authorization enforcer
#[derive(Debug, Clone)]
pub struct Authorization {
    config: Arc<AuthorizationConfig>,
}

impl Authorization {
    pub fn new(config: AuthorizationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Share one configuration between enforcers
    pub fn with_shared_config(config: Arc<AuthorizationConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// Identity of the current request
    pub fn identity(&self, ctx: &RequestContext) -> AuthorizationResult<Arc<dyn Identity>> {
        ctx.identity(&self.config.identity_attribute)
    }

    /// Authorization service of the current request
    pub fn service(
        &self,
        ctx: &RequestContext,
    ) -> AuthorizationResult<Arc<dyn AuthorizationService>> {
        ctx.service(&self.config.service_attribute)
    }

    /// Authorization action for the request's routed action
    pub fn resolve_action(&self, ctx: &RequestContext) -> AuthorizationResult<String> {
        self.config.action_map.resolve(ctx.action())
    }

    fn action_for(
        &self,
        ctx: &RequestContext,
        action: Option<&str>,
    ) -> AuthorizationResult<String> {
        match action {
            Some(action) => Ok(action.to_string()),
            None => self.resolve_action(ctx),
        }
    }

    /// Raise [`AuthorizationError::Denied`] unless the identity may perform
    /// `action` (default: the request's resolved action) on `resource`.
    ///
    /// On success the service moves to `Authorized`.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        resource: &dyn Resource,
        action: Option<&str>,
    ) -> AuthorizationResult<()> {
        let result = self.authorize_inner(ctx, resource, action).await;
        if let Err(ref e) = result {
            record_failure(e);
        }
        result
    }

    async fn authorize_inner(
        &self,
        ctx: &RequestContext,
        resource: &dyn Resource,
        action: Option<&str>,
    ) -> AuthorizationResult<()> {
        let action = self.action_for(ctx, action)?;
        let identity = self.identity(ctx)?;
        let service = self.service(ctx)?;
        let resource = inner_resource(resource);
        let resource_type = resource.resource_type();

        let allowed = identity.can(&action, resource).await?;
        record_decision(&action, allowed);

        if !allowed {
            info!(
                authz.action = %action,
                authz.resource_type = %resource_type,
                authz.decision = "deny",
                "Authorization denied"
            );
            return Err(AuthorizationError::Denied {
                action,
                resource_type,
            });
        }

        service.authorization_checked();
        info!(
            authz.action = %action,
            authz.resource_type = %resource_type,
            authz.decision = "allow",
            "Authorization granted"
        );
        Ok(())
    }

    /// Decision for `action` on `resource` without raising on denial.
    ///
    /// Does not touch the service state.
    pub async fn can(
        &self,
        ctx: &RequestContext,
        resource: &dyn Resource,
        action: Option<&str>,
    ) -> AuthorizationResult<bool> {
        let action = self.action_for(ctx, action)?;
        let identity = self.identity(ctx)?;
        identity.can(&action, inner_resource(resource)).await
    }

    /// Narrow `resource` to what the identity may see for `action`.
    ///
    /// Returns exactly what the identity produced; a restrictive scope is
    /// not an error.
    pub async fn apply_scope<R: Resource>(
        &self,
        ctx: &RequestContext,
        resource: R,
        action: Option<&str>,
    ) -> AuthorizationResult<R> {
        let action = self.action_for(ctx, action)?;
        let identity = self.identity(ctx)?;

        let scoped = identity.apply_scope(&action, Box::new(resource)).await?;
        let actual = (*scoped).resource_type();

        scoped
            .into_any()
            .downcast::<R>()
            .map(|typed| *typed)
            .map_err(|_| AuthorizationError::ScopeMismatch {
                action,
                expected: short_type_name(std::any::type_name::<R>()),
                actual,
            })
    }

    /// Mark the current request as intentionally not authorized
    pub fn skip_authorization(&self, ctx: &RequestContext) -> AuthorizationResult<&Self> {
        let service = self.service(ctx).inspect_err(record_failure)?;
        service.skip_authorization();

        record_skip(ctx.action());
        info!(
            authz.action = %ctx.action(),
            authz.decision = "skip",
            "Authorization skipped"
        );
        Ok(self)
    }
}

#[cfg(feature = "metrics")]
fn record_decision(action: &str, allowed: bool) {
    crate::metrics::record_decision(action, allowed);
}

#[cfg(feature = "metrics")]
fn record_skip(action: &str) {
    crate::metrics::record_skip(action);
}

#[cfg(feature = "metrics")]
fn record_failure(error: &AuthorizationError) {
    if !matches!(error, AuthorizationError::Denied { .. }) {
        crate::metrics::record_error(error.kind());
    }
}

#[cfg(not(feature = "metrics"))]
fn record_decision(_action: &str, _allowed: bool) {}

#[cfg(not(feature = "metrics"))]
fn record_skip(_action: &str) {}

#[cfg(not(feature = "metrics"))]
fn record_failure(_error: &AuthorizationError) {}
