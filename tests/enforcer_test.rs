//! Enforcer Integration Tests
//!
//! Exercises `Authorization` through `PolicyIdentity` and a registry of
//! typed policies, the way a host application wires it.

use async_trait::async_trait;
use komainu::action::ActionMap;
use komainu::config::AuthorizationConfig;
use komainu::context::RequestContext;
use komainu::enforcer::Authorization;
use komainu::error::{AuthorizationError, AuthorizationResult};
use komainu::identity::{Identity, PolicyIdentity, Subject};
use komainu::policy::{Policy, PolicyResolver};
use komainu::resource::Resource;
use komainu::service::{AuthorizationService, AuthorizationState, RequestAuthorization};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Article {
    id: u32,
    author: String,
    published: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Articles(Vec<Article>);

#[derive(Debug)]
struct Comment;

struct ArticlePolicy;

#[async_trait]
impl Policy<Article> for ArticlePolicy {
    async fn can(
        &self,
        subject: &Subject,
        action: &str,
        article: &Article,
    ) -> AuthorizationResult<bool> {
        Ok(match action {
            "view" => article.published || article.author == subject.id,
            "edit" | "delete" => article.author == subject.id || subject.has_role("admin"),
            _ => false,
        })
    }
}

struct ArticlesPolicy;

#[async_trait]
impl Policy<Articles> for ArticlesPolicy {
    async fn can(
        &self,
        _subject: &Subject,
        action: &str,
        _articles: &Articles,
    ) -> AuthorizationResult<bool> {
        Ok(action == "list")
    }

    async fn scope(
        &self,
        subject: &Subject,
        _action: &str,
        articles: Articles,
    ) -> AuthorizationResult<Articles> {
        Ok(Articles(
            articles
                .0
                .into_iter()
                .filter(|a| a.published || a.author == subject.id)
                .collect(),
        ))
    }
}

fn resolver() -> Arc<PolicyResolver> {
    Arc::new(
        PolicyResolver::new()
            .with::<Article, _>(ArticlePolicy)
            .with::<Articles, _>(ArticlesPolicy),
    )
}

fn identity(id: &str) -> Arc<dyn Identity> {
    PolicyIdentity::new(Subject::new(id), resolver()).into_shared()
}

fn draft_by(author: &str) -> Article {
    Article {
        id: 7,
        author: author.to_string(),
        published: false,
    }
}

fn request(
    config: &AuthorizationConfig,
    action: &str,
    identity: Arc<dyn Identity>,
) -> (RequestContext, Arc<RequestAuthorization>) {
    let service = Arc::new(RequestAuthorization::new());
    let ctx = RequestContext::new(action)
        .with_identity(&config.identity_attribute, identity)
        .with_service(&config.service_attribute, service.clone());
    (ctx, service)
}

#[tokio::test]
async fn test_owner_may_edit_own_draft() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "edit", identity("alice"));
    let authorization = Authorization::new(config);

    authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap();

    assert_eq!(service.state(), AuthorizationState::Authorized);
}

#[tokio::test]
async fn test_denial_names_action_and_resource_type() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "edit", identity("bob"));
    let authorization = Authorization::new(config);

    let err = authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::Denied {
            action: "edit".into(),
            resource_type: "Article".into(),
        }
    );
    assert_eq!(err.status_code(), 403);
    assert_eq!(service.state(), AuthorizationState::Unchecked);
}

#[tokio::test]
async fn test_admin_claim_reaches_policy() {
    let config = AuthorizationConfig::default();
    let admin = PolicyIdentity::new(
        Subject::new("carol").with_claim("roles", json!(["admin"])),
        resolver(),
    );
    let (ctx, _) = request(&config, "delete", admin.into_shared());
    let authorization = Authorization::new(config);

    assert!(authorization
        .can(&ctx, &draft_by("alice"), None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_explicit_action_overrides_mapping() {
    let config = AuthorizationConfig {
        action_map: ActionMap::new().with("update", "edit"),
        ..Default::default()
    };
    let (ctx, _) = request(&config, "update", identity("bob"));
    let authorization = Authorization::new(config);

    // Mapped action: bob may not edit alice's draft
    assert!(!authorization
        .can(&ctx, &draft_by("alice"), None)
        .await
        .unwrap());

    let published = Article {
        published: true,
        ..draft_by("alice")
    };
    authorization
        .authorize(&ctx, &published, Some("view"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unregistered_resource_type() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "view", identity("alice"));
    let authorization = Authorization::new(config);

    let err = authorization.authorize(&ctx, &Comment, None).await.unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::MissingPolicy {
            resource_type: "Comment".into()
        }
    );
    assert!(err.is_configuration_error());
    assert_eq!(service.state(), AuthorizationState::Unchecked);
}

#[tokio::test]
async fn test_scope_keeps_visible_articles() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "index", identity("bob"));
    let authorization = Authorization::new(config);

    let all = Articles(vec![
        draft_by("alice"),
        draft_by("bob"),
        Article {
            id: 9,
            author: "alice".into(),
            published: true,
        },
    ]);

    let visible = authorization
        .apply_scope(&ctx, all, Some("list"))
        .await
        .unwrap();

    assert_eq!(visible.0.len(), 2);
    assert!(visible.0.iter().all(|a| a.published || a.author == "bob"));
    assert_eq!(service.state(), AuthorizationState::Unchecked);
}

#[tokio::test]
async fn test_scope_without_policy_scope() {
    let config = AuthorizationConfig::default();
    let (ctx, _) = request(&config, "view", identity("alice"));
    let authorization = Authorization::new(config);

    let err = authorization
        .apply_scope(&ctx, draft_by("alice"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::MissingScope {
            action: "view".into(),
            resource_type: "Article".into(),
        }
    );
}

#[tokio::test]
async fn test_absent_identity_value() {
    let config = AuthorizationConfig::default();
    let ctx = RequestContext::new("view")
        .with_attribute(&config.identity_attribute, None::<Arc<dyn Identity>>)
        .with_service(&config.service_attribute, Arc::new(RequestAuthorization::new()));
    let authorization = Authorization::new(config);

    let err = authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::MissingIdentity {
            attribute: "identity".into()
        }
    );
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_identity_attribute_of_wrong_type() {
    let config = AuthorizationConfig::default();
    let ctx = RequestContext::new("view")
        .with_attribute(&config.identity_attribute, String::from("alice"))
        .with_service(&config.service_attribute, Arc::new(RequestAuthorization::new()));
    let authorization = Authorization::new(config);

    let err = authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::InvalidConfiguration {
            key: "identity".into(),
            expected: "Identity".into(),
            actual: "String".into(),
        }
    );
}

#[tokio::test]
async fn test_authorize_requires_service() {
    let config = AuthorizationConfig::default();
    let ctx =
        RequestContext::new("edit").with_identity(&config.identity_attribute, identity("alice"));
    let authorization = Authorization::new(config);

    let err = authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthorizationError::MissingService {
            attribute: "authorization".into()
        }
    );
}

#[tokio::test]
async fn test_first_terminal_state_wins() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "edit", identity("alice"));
    let authorization = Authorization::new(config);

    authorization.skip_authorization(&ctx).unwrap();
    authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap();

    assert_eq!(service.state(), AuthorizationState::Skipped);
}

#[test]
fn test_custom_attribute_names() {
    let config = AuthorizationConfig {
        identity_attribute: "user".into(),
        service_attribute: "authz".into(),
        ..Default::default()
    };
    let (ctx, service) = request(&config, "login", identity("alice"));
    assert!(ctx.has_attribute("user"));
    assert!(ctx.has_attribute("authz"));

    Authorization::new(config).skip_authorization(&ctx).unwrap();
    assert_eq!(service.state(), AuthorizationState::Skipped);
}

#[tokio::test]
async fn test_concrete_policy_identity_attribute() {
    let config = AuthorizationConfig::default();
    let alice = Arc::new(PolicyIdentity::new(Subject::new("alice"), resolver()));
    let service = Arc::new(RequestAuthorization::new());
    let ctx = RequestContext::new("edit")
        .with_attribute(&config.identity_attribute, alice)
        .with_service(&config.service_attribute, service.clone());
    let authorization = Authorization::new(config);

    authorization
        .authorize(&ctx, &draft_by("alice"), None)
        .await
        .unwrap();

    assert_eq!(service.state(), AuthorizationState::Authorized);
}

#[tokio::test]
async fn test_boxed_model_is_authorized_as_its_content() {
    let config = AuthorizationConfig::default();
    let (ctx, service) = request(&config, "edit", identity("bob"));
    let authorization = Authorization::new(config);

    let model: Box<dyn Resource> = Box::new(draft_by("bob"));
    assert!(authorization.can(&ctx, &model, None).await.unwrap());
    authorization.authorize(&ctx, &model, None).await.unwrap();
    assert_eq!(service.state(), AuthorizationState::Authorized);

    let other: Box<dyn Resource> = Box::new(draft_by("alice"));
    let err = authorization.authorize(&ctx, &other, None).await.unwrap_err();
    assert_eq!(
        err,
        AuthorizationError::Denied {
            action: "edit".into(),
            resource_type: "Article".into(),
        }
    );
}
