//! OPA (Open Policy Agent) policy backend
//!
//! Delegates decisions for any serializable resource to an OPA server.
//!
//! # Example
//!
//! ```no_run
//! use komainu::policy::opa::OpaPolicy;
//! use komainu::policy::PolicyResolver;
//! use std::time::Duration;
//!
//! #[derive(serde::Serialize)]
//! struct Document {
//!     owner: String,
//! }
//!
//! let opa = OpaPolicy::builder()
//!     .url("http://localhost:8181")
//!     .policy_path("komainu/allow")
//!     .timeout(Duration::from_secs(5))
//!     .cache_ttl(Duration::from_secs(60))
//!     .build()
//!     .expect("valid config");
//!
//! let resolver = PolicyResolver::new().with::<Document, _>(opa);
//! ```

use super::Policy;
use crate::error::{AuthorizationError, AuthorizationResult};
use crate::identity::Subject;
use crate::resource::Resource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Default timeout for OPA requests (5 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum cache size to prevent unbounded memory growth
const MAX_CACHE_SIZE: usize = 10_000;

/// OPA client configuration
#[derive(Debug, Clone)]
pub struct OpaConfig {
    /// OPA server URL (e.g., "http://localhost:8181")
    pub url: String,
    /// Policy path in OPA (e.g., "komainu/allow")
    pub policy_path: String,
    /// Request timeout (default: 5 seconds)
    pub timeout: Option<Duration>,
    /// Cache TTL for decisions (None = no caching)
    pub cache_ttl: Option<Duration>,
}

struct CachedDecision {
    allowed: bool,
    cached_at: Instant,
}

/// Policy evaluated by an OPA server
#[derive(Clone)]
pub struct OpaPolicy {
    config: OpaConfig,
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedDecision>>>,
}

/// Builder for OpaPolicy
#[derive(Default)]
pub struct OpaPolicyBuilder {
    url: Option<String>,
    policy_path: Option<String>,
    timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct OpaInput<'a> {
    input: OpaInputData<'a>,
}

#[derive(Debug, Serialize)]
struct OpaInputData<'a> {
    subject: &'a str,
    claims: &'a HashMap<String, serde_json::Value>,
    action: &'a str,
    resource_type: String,
    resource: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpaResponse {
    result: Option<bool>,
}

impl OpaPolicyBuilder {
    /// Set the OPA server URL
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Set the policy path
    pub fn policy_path(mut self, path: &str) -> Self {
        self.policy_path = Some(path.to_string());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cache TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> AuthorizationResult<OpaPolicy> {
        let url = self.url.ok_or_else(|| {
            AuthorizationError::invalid_configuration("opa.url", "URL", "nothing")
        })?;
        let policy_path = self.policy_path.ok_or_else(|| {
            AuthorizationError::invalid_configuration("opa.policy_path", "policy path", "nothing")
        })?;

        OpaPolicy::new(OpaConfig {
            url,
            policy_path,
            timeout: self.timeout,
            cache_ttl: self.cache_ttl,
        })
    }
}

impl OpaPolicy {
    /// Create a new OPA policy
    pub fn new(config: OpaConfig) -> AuthorizationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| AuthorizationError::Backend(e.to_string()))?;

        Ok(Self {
            config,
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn builder() -> OpaPolicyBuilder {
        OpaPolicyBuilder::default()
    }

    pub fn config(&self) -> &OpaConfig {
        &self.config
    }

    async fn check_cache(&self, key: &str) -> Option<bool> {
        let ttl = self.config.cache_ttl?;
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|cached| cached.cached_at.elapsed() < ttl)
            .map(|cached| cached.allowed)
    }

    async fn store_cache(&self, key: String, allowed: bool) {
        let Some(ttl) = self.config.cache_ttl else {
            return;
        };
        let mut cache = self.cache.write().await;

        if cache.len() >= MAX_CACHE_SIZE {
            cache.retain(|_, v| v.cached_at.elapsed() < ttl);
        }

        // Still full: drop the oldest tenth
        if cache.len() >= MAX_CACHE_SIZE {
            let mut entries: Vec<_> = cache
                .iter()
                .map(|(k, v)| (k.clone(), v.cached_at))
                .collect();
            entries.sort_by_key(|(_, t)| *t);
            for (key, _) in entries.into_iter().take(MAX_CACHE_SIZE / 10) {
                cache.remove(&key);
            }
        }

        cache.insert(
            key,
            CachedDecision {
                allowed,
                cached_at: Instant::now(),
            },
        );
    }

    /// Clear all cached decisions
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn evaluate(
        &self,
        subject: &Subject,
        action: &str,
        resource_type: String,
        resource: serde_json::Value,
    ) -> AuthorizationResult<bool> {
        let input = OpaInput {
            input: OpaInputData {
                subject: &subject.id,
                claims: &subject.claims,
                action,
                resource_type,
                resource,
            },
        };
        // The serialized input doubles as the cache key
        let body =
            serde_json::to_string(&input).map_err(|e| AuthorizationError::Backend(e.to_string()))?;

        if let Some(allowed) = self.check_cache(&body).await {
            debug!(authz.action = %action, authz.allowed = allowed, "OPA decision (cached)");
            return Ok(allowed);
        }

        let url = format!(
            "{}/v1/data/{}",
            self.config.url.trim_end_matches('/'),
            self.config.policy_path.trim_start_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.clone())
            .send()
            .await
            .map_err(|e| AuthorizationError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthorizationError::Backend(format!(
                "OPA returned status {}",
                response.status()
            )));
        }

        let opa_response: OpaResponse = response
            .json()
            .await
            .map_err(|e| AuthorizationError::Backend(e.to_string()))?;

        // Undefined or null result means the policy did not allow
        let allowed = opa_response.result.unwrap_or(false);
        self.store_cache(body, allowed).await;

        debug!(authz.action = %action, authz.allowed = allowed, "OPA decision");
        Ok(allowed)
    }
}

#[async_trait]
impl<R> Policy<R> for OpaPolicy
where
    R: Resource + Serialize,
{
    async fn can(
        &self,
        subject: &Subject,
        action: &str,
        resource: &R,
    ) -> AuthorizationResult<bool> {
        let resource_json =
            serde_json::to_value(resource).map_err(|e| AuthorizationError::Backend(e.to_string()))?;
        self.evaluate(subject, action, resource.resource_type(), resource_json)
            .await
    }
}
