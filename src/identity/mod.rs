//! Identity module
//!
//! An [`Identity`] is the authenticated principal attached to a request.
//! It answers two questions for the enforcer: may this action be performed
//! on this resource, and what is the narrowed view of this resource.
//!
//! [`PolicyIdentity`] is the stock implementation: an authenticated
//! [`Subject`] dispatching through a shared [`PolicyResolver`].

use crate::error::AuthorizationResult;
use crate::policy::PolicyResolver;
use crate::resource::Resource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity capability trait
#[async_trait]
pub trait Identity: Send + Sync {
    /// Check if `action` may be performed on `resource`
    async fn can(&self, action: &str, resource: &dyn Resource) -> AuthorizationResult<bool>;

    /// Narrow `resource` to what this identity may see for `action`
    async fn apply_scope(
        &self,
        action: &str,
        resource: Box<dyn Resource>,
    ) -> AuthorizationResult<Box<dyn Resource>>;
}

/// Authenticated principal, as produced by the authentication layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            claims: HashMap::new(),
        }
    }

    /// Add a claim
    pub fn with_claim(mut self, name: &str, value: serde_json::Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.get(name)
    }

    /// Whether the `roles` claim (a string or list of strings) contains `role`
    pub fn has_role(&self, role: &str) -> bool {
        match self.claims.get("roles") {
            Some(serde_json::Value::String(r)) => r == role,
            Some(serde_json::Value::Array(roles)) => {
                roles.iter().any(|r| r.as_str() == Some(role))
            }
            _ => false,
        }
    }
}

/// Identity backed by a policy registry
#[derive(Debug, Clone)]
pub struct PolicyIdentity {
    subject: Subject,
    resolver: Arc<PolicyResolver>,
}

impl PolicyIdentity {
    pub fn new(subject: Subject, resolver: Arc<PolicyResolver>) -> Self {
        Self { subject, resolver }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Wrap as the trait object stored in a request context
    pub fn into_shared(self) -> Arc<dyn Identity> {
        Arc::new(self)
    }
}

#[async_trait]
impl Identity for PolicyIdentity {
    async fn can(&self, action: &str, resource: &dyn Resource) -> AuthorizationResult<bool> {
        self.resolver.can(&self.subject, action, resource).await
    }

    async fn apply_scope(
        &self,
        action: &str,
        resource: Box<dyn Resource>,
    ) -> AuthorizationResult<Box<dyn Resource>> {
        self.resolver.scope(&self.subject, action, resource).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthorizationError;
    use crate::policy::Policy;
    use serde_json::json;

    struct Note {
        owner: String,
    }

    struct NotePolicy;

    #[async_trait]
    impl Policy<Note> for NotePolicy {
        async fn can(
            &self,
            subject: &Subject,
            action: &str,
            resource: &Note,
        ) -> AuthorizationResult<bool> {
            Ok(match action {
                "view" => true,
                "edit" => resource.owner == subject.id,
                _ => false,
            })
        }
    }

    #[test]
    fn test_subject_roles() {
        let subject = Subject::new("alice").with_claim("roles", json!(["admin", "editor"]));
        assert!(subject.has_role("admin"));
        assert!(!subject.has_role("owner"));

        let subject = Subject::new("bob").with_claim("roles", json!("viewer"));
        assert!(subject.has_role("viewer"));
        assert!(!Subject::new("carol").has_role("viewer"));
    }

    #[tokio::test]
    async fn test_policy_identity_dispatches_to_policy() {
        let resolver = Arc::new(PolicyResolver::new().with::<Note, _>(NotePolicy));
        let identity = PolicyIdentity::new(Subject::new("alice"), resolver);
        let note = Note {
            owner: "alice".into(),
        };

        assert!(identity.can("view", &note).await.unwrap());
        assert!(identity.can("edit", &note).await.unwrap());
        assert!(!identity.can("delete", &note).await.unwrap());

        let other = Note {
            owner: "bob".into(),
        };
        assert!(!identity.can("edit", &other).await.unwrap());
    }

    #[tokio::test]
    async fn test_policy_identity_without_scope() {
        let resolver = Arc::new(PolicyResolver::new().with::<Note, _>(NotePolicy));
        let identity = PolicyIdentity::new(Subject::new("alice"), resolver);

        let result = identity
            .apply_scope(
                "index",
                Box::new(Note {
                    owner: "alice".into(),
                }),
            )
            .await;
        assert!(matches!(
            result,
            Err(AuthorizationError::MissingScope { ref action, ref resource_type })
                if action == "index" && resource_type == "Note"
        ));
    }
}
