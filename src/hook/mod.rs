//! Lifecycle hook
//!
//! Runs authorization once per request, before the handler body. The hook
//! is bound to exactly one lifecycle event (`authorization_event`); the
//! binding `{event: "authorize_action"}` is the whole contract with the
//! host pipeline.
//!
//! For each request, [`AuthorizationHook::authorize_action`]:
//!
//! 1. reads the routed action,
//! 2. skips authorization if `skip_authorization` is on for it,
//! 3. otherwise, if `authorize_model` is on, loads the default model and
//!    authorizes it with the resolved action,
//! 4. otherwise leaves the check to the handler.
//!
//! [`AuthorizationHook::finish`] is the end-of-request assertion that
//! catches handlers that never authorized or skipped.

use crate::context::RequestContext;
use crate::enforcer::Authorization;
use crate::error::{AuthorizationError, AuthorizationResult};
use crate::gate::{decide, SwitchKey};
use crate::resource::Resource;
use crate::service::ensure_handled;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

/// Handler name bound to the authorization event
pub const AUTHORIZE_ACTION: &str = "authorize_action";

/// Loads the default model of a request (e.g. the record named by the route)
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn default_model(&self, ctx: &RequestContext) -> AuthorizationResult<Box<dyn Resource>>;
}

/// What the hook did for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// `skip_authorization` applied
    Skipped,
    /// The default model was authorized
    Authorized,
    /// Automatic checks are off for this action; the handler must authorize
    Deferred,
    /// The event is not the authorization event
    NotBound,
}

/// Automatic per-request authorization
#[derive(Debug, Clone)]
pub struct AuthorizationHook {
    authorization: Authorization,
}

impl AuthorizationHook {
    pub fn new(authorization: Authorization) -> Self {
        Self { authorization }
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// Event name to handler name table
    pub fn implemented_events(&self) -> BTreeMap<String, &'static str> {
        let mut events = BTreeMap::new();
        events.insert(
            self.authorization.config().authorization_event.clone(),
            AUTHORIZE_ACTION,
        );
        events
    }

    /// Dispatch a lifecycle event; only the configured event runs authorization
    pub async fn handle_event(
        &self,
        event: &str,
        ctx: &RequestContext,
        loader: &dyn ModelLoader,
    ) -> AuthorizationResult<HookOutcome> {
        let bound = self.authorization.config().authorization_event.as_str();
        if event != bound {
            warn!(
                event = %event,
                authz.event = %bound,
                "Event is not bound to authorization"
            );
            return Ok(HookOutcome::NotBound);
        }
        self.authorize_action(ctx, loader).await
    }

    /// Authorize the current request according to the per-action switches
    pub async fn authorize_action(
        &self,
        ctx: &RequestContext,
        loader: &dyn ModelLoader,
    ) -> AuthorizationResult<HookOutcome> {
        let config = self.authorization.config();
        let action = ctx.action();

        if decide(action, SwitchKey::SkipAuthorization, config) {
            self.authorization.skip_authorization(ctx)?;
            return Ok(HookOutcome::Skipped);
        }

        if decide(action, SwitchKey::AuthorizeModel, config) {
            let model = loader.default_model(ctx).await?;
            self.authorization.authorize(ctx, &*model, None).await?;
            return Ok(HookOutcome::Authorized);
        }

        debug!(authz.action = %action, "Automatic authorization off; deferring to handler");
        Ok(HookOutcome::Deferred)
    }

    /// End-of-request assertion: the request was authorized or skipped
    pub fn finish(&self, ctx: &RequestContext) -> AuthorizationResult<()> {
        let service = self.authorization.service(ctx)?;
        ensure_handled(&*service, ctx.action())
    }

    /// Run `handler` between automatic authorization and the end-of-request
    /// assertion
    pub async fn intercept<F, Fut, T, E>(
        &self,
        ctx: &RequestContext,
        loader: &dyn ModelLoader,
        handler: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthorizationError>,
    {
        let event = self.authorization.config().authorization_event.clone();
        self.handle_event(&event, ctx, loader).await?;
        let output = handler().await?;
        self.finish(ctx)?;
        Ok(output)
    }
}
