//! Policy resolution
//!
//! Policies are registered per resource type. The resolver maps a
//! resource's runtime [`TypeId`] to the policy for that type and invokes
//! it, so call sites only ever see `&dyn Resource`.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use komainu::error::AuthorizationResult;
//! use komainu::identity::Subject;
//! use komainu::policy::{Policy, PolicyResolver};
//!
//! struct Article {
//!     author: String,
//! }
//!
//! struct ArticlePolicy;
//!
//! #[async_trait]
//! impl Policy<Article> for ArticlePolicy {
//!     async fn can(
//!         &self,
//!         subject: &Subject,
//!         action: &str,
//!         article: &Article,
//!     ) -> AuthorizationResult<bool> {
//!         Ok(match action {
//!             "view" => true,
//!             "edit" | "delete" => article.author == subject.id,
//!             _ => false,
//!         })
//!     }
//! }
//!
//! let resolver = PolicyResolver::new().with::<Article, _>(ArticlePolicy);
//! assert!(resolver.contains::<Article>());
//! ```

use crate::error::{AuthorizationError, AuthorizationResult};
use crate::identity::Subject;
use crate::resource::{inner_resource, short_type_name, Resource};
use async_trait::async_trait;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

pub mod opa;

/// Policy for one resource type
#[async_trait]
pub trait Policy<R: Resource>: Send + Sync {
    /// Decide whether `subject` may perform `action` on `resource`
    async fn can(&self, subject: &Subject, action: &str, resource: &R)
        -> AuthorizationResult<bool>;

    /// Narrow `resource` for `action`.
    ///
    /// Policies without scopes fail with [`AuthorizationError::MissingScope`].
    async fn scope(&self, _subject: &Subject, action: &str, resource: R) -> AuthorizationResult<R> {
        Err(AuthorizationError::MissingScope {
            action: action.to_string(),
            resource_type: resource.resource_type(),
        })
    }
}

#[async_trait]
trait ErasedPolicy: Send + Sync {
    async fn can(
        &self,
        subject: &Subject,
        action: &str,
        resource: &dyn Resource,
    ) -> AuthorizationResult<bool>;

    async fn scope(
        &self,
        subject: &Subject,
        action: &str,
        resource: Box<dyn Resource>,
    ) -> AuthorizationResult<Box<dyn Resource>>;
}

struct TypedPolicy<R, P> {
    policy: P,
    _resource: PhantomData<fn() -> R>,
}

#[async_trait]
impl<R, P> ErasedPolicy for TypedPolicy<R, P>
where
    R: Resource,
    P: Policy<R>,
{
    async fn can(
        &self,
        subject: &Subject,
        action: &str,
        resource: &dyn Resource,
    ) -> AuthorizationResult<bool> {
        match resource.as_any().downcast_ref::<R>() {
            Some(typed) => self.policy.can(subject, action, typed).await,
            None => Err(AuthorizationError::MissingPolicy {
                resource_type: resource.resource_type(),
            }),
        }
    }

    async fn scope(
        &self,
        subject: &Subject,
        action: &str,
        resource: Box<dyn Resource>,
    ) -> AuthorizationResult<Box<dyn Resource>> {
        let resource_type = (*resource).resource_type();
        match resource.into_any().downcast::<R>() {
            Ok(typed) => {
                let scoped = self.policy.scope(subject, action, *typed).await?;
                Ok(Box::new(scoped) as Box<dyn Resource>)
            }
            Err(_) => Err(AuthorizationError::MissingPolicy { resource_type }),
        }
    }
}

/// Registry from resource type to policy
#[derive(Default, Clone)]
pub struct PolicyResolver {
    policies: HashMap<TypeId, Arc<dyn ErasedPolicy>>,
    names: HashMap<TypeId, String>,
}

impl PolicyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the policy for resources of type `R`, replacing any previous one
    pub fn register<R, P>(&mut self, policy: P) -> &mut Self
    where
        R: Resource,
        P: Policy<R> + 'static,
    {
        let type_id = TypeId::of::<R>();
        self.policies.insert(
            type_id,
            Arc::new(TypedPolicy {
                policy,
                _resource: PhantomData,
            }),
        );
        self.names
            .insert(type_id, short_type_name(std::any::type_name::<R>()));
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<R, P>(mut self, policy: P) -> Self
    where
        R: Resource,
        P: Policy<R> + 'static,
    {
        self.register::<R, P>(policy);
        self
    }

    pub fn contains<R: Resource>(&self) -> bool {
        self.policies.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn policy_for(&self, resource: &dyn Resource) -> AuthorizationResult<Arc<dyn ErasedPolicy>> {
        self.policies
            .get(&resource.as_any().type_id())
            .cloned()
            .ok_or_else(|| AuthorizationError::MissingPolicy {
                resource_type: resource.resource_type(),
            })
    }

    /// Ask the registered policy whether `subject` may perform `action`
    pub async fn can(
        &self,
        subject: &Subject,
        action: &str,
        resource: &dyn Resource,
    ) -> AuthorizationResult<bool> {
        let resource = inner_resource(resource);
        let policy = self.policy_for(resource)?;

        let started = Instant::now();
        let result = policy.can(subject, action, resource).await;
        record_evaluation(&resource.resource_type(), started);

        result
    }

    /// Let the registered policy narrow `resource`
    pub async fn scope(
        &self,
        subject: &Subject,
        action: &str,
        resource: Box<dyn Resource>,
    ) -> AuthorizationResult<Box<dyn Resource>> {
        let policy = self.policy_for(&*resource)?;
        policy.scope(subject, action, resource).await
    }
}

impl fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.names.values().collect();
        names.sort();
        f.debug_struct("PolicyResolver")
            .field("policies", &names)
            .finish()
    }
}

#[cfg(feature = "metrics")]
fn record_evaluation(resource_type: &str, started: Instant) {
    crate::metrics::record_policy_duration(resource_type, started.elapsed().as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
fn record_evaluation(_resource_type: &str, _started: Instant) {}
