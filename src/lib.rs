//! Komainu Library
//!
//! Per-request authorization enforcement for server request handling.
//!
//! # Features
//!
//! - **One Check Per Request**: every request is authorized, explicitly
//!   skipped, or flagged as unauthorized at the end
//! - **Pluggable Identities**: any [`identity::Identity`] can decide and scope
//! - **Typed Policies**: per-resource-type policies behind a registry
//! - **OPA Backend**: delegate decisions to Open Policy Agent
//! - **Per-Action Switches**: wildcard defaults with per-action overrides
//!
//! # Example
//!
//! ```no_run
//! use komainu::config::AuthorizationConfig;
//! use komainu::context::RequestContext;
//! use komainu::enforcer::Authorization;
//! use komainu::hook::{AuthorizationHook, ModelLoader};
//! use komainu::service::RequestAuthorization;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     identity: Arc<dyn komainu::identity::Identity>,
//! #     loader: &dyn ModelLoader,
//! # ) -> anyhow::Result<()> {
//! let config = AuthorizationConfig::load("authorization.yaml")?;
//! let hook = AuthorizationHook::new(Authorization::new(config.clone()));
//!
//! let ctx = RequestContext::new("edit")
//!     .with_identity(&config.identity_attribute, identity)
//!     .with_service(&config.service_attribute, Arc::new(RequestAuthorization::new()));
//!
//! hook.intercept(&ctx, loader, || async { Ok::<_, anyhow::Error>(()) }).await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod enforcer;
pub mod error;
pub mod gate;
pub mod hook;
pub mod identity;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod policy;
pub mod resource;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::AuthorizationConfig;
pub use context::RequestContext;
pub use enforcer::Authorization;
pub use error::{AuthorizationError, AuthorizationResult};
pub use hook::{AuthorizationHook, HookOutcome, ModelLoader};
pub use identity::{Identity, PolicyIdentity, Subject};
pub use policy::{Policy, PolicyResolver};
pub use resource::Resource;
pub use service::{AuthorizationService, AuthorizationState, RequestAuthorization};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
