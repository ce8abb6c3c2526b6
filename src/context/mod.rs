//! Request context
//!
//! Request-scoped attribute storage plus the routed parameters. The
//! identity and the authorization service are looked up here by the keys
//! configured in [`AuthorizationConfig`](crate::config::AuthorizationConfig).
//!
//! Attributes are stored dynamically, so a value under the identity key may
//! turn out to be something else; lookups report that as
//! [`AuthorizationError::InvalidConfiguration`] with the actual type.

use crate::error::{AuthorizationError, AuthorizationResult};
use crate::identity::{Identity, PolicyIdentity};
use crate::resource::short_type_name;
use crate::service::{AuthorizationService, RequestAuthorization};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Route parameter holding the routed action name
pub const ACTION_PARAM: &str = "action";

#[derive(Clone)]
struct Attribute {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Per-request context
#[derive(Clone)]
pub struct RequestContext {
    params: BTreeMap<String, String>,
    attributes: HashMap<String, Attribute>,
}

impl RequestContext {
    /// Create a context for a request routed to `action`
    pub fn new(action: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(ACTION_PARAM.to_string(), action.into());
        Self {
            params,
            attributes: HashMap::new(),
        }
    }

    /// Routed action name
    pub fn action(&self) -> &str {
        self.params
            .get(ACTION_PARAM)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Store an arbitrary attribute
    pub fn set_attribute<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        self.attributes.insert(
            key.to_string(),
            Attribute {
                type_name: std::any::type_name::<T>(),
                value: Arc::new(value),
            },
        );
    }

    pub fn with_attribute<T: Any + Send + Sync>(mut self, key: &str, value: T) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn remove_attribute(&mut self, key: &str) -> bool {
        self.attributes.remove(key).is_some()
    }

    /// Typed attribute lookup
    pub fn attribute<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.attributes
            .get(key)
            .and_then(|attr| attr.value.downcast_ref::<T>())
    }

    /// Short type name of the attribute stored under `key`
    pub fn attribute_type(&self, key: &str) -> Option<String> {
        self.attributes
            .get(key)
            .map(|attr| short_type_name(attr.type_name))
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Store the request identity under `key`
    pub fn with_identity(self, key: &str, identity: Arc<dyn Identity>) -> Self {
        self.with_attribute(key, identity)
    }

    /// Store the request authorization service under `key`
    pub fn with_service(self, key: &str, service: Arc<dyn AuthorizationService>) -> Self {
        self.with_attribute(key, service)
    }

    /// Look up the identity stored under `key`
    pub fn identity(&self, key: &str) -> AuthorizationResult<Arc<dyn Identity>> {
        let missing = || AuthorizationError::MissingIdentity {
            attribute: key.to_string(),
        };
        let attr = self.attributes.get(key).ok_or_else(missing)?;

        if let Some(identity) = attr.value.downcast_ref::<Arc<dyn Identity>>() {
            return Ok(identity.clone());
        }
        if let Some(maybe) = attr.value.downcast_ref::<Option<Arc<dyn Identity>>>() {
            return maybe.clone().ok_or_else(missing);
        }
        if let Some(identity) = attr.value.downcast_ref::<Arc<PolicyIdentity>>() {
            let identity: Arc<dyn Identity> = identity.clone();
            return Ok(identity);
        }

        Err(AuthorizationError::invalid_configuration(
            key,
            "Identity",
            short_type_name(attr.type_name),
        ))
    }

    /// Look up the authorization service stored under `key`
    pub fn service(&self, key: &str) -> AuthorizationResult<Arc<dyn AuthorizationService>> {
        let attr = self
            .attributes
            .get(key)
            .ok_or_else(|| AuthorizationError::MissingService {
                attribute: key.to_string(),
            })?;

        if let Some(service) = attr.value.downcast_ref::<Arc<dyn AuthorizationService>>() {
            return Ok(service.clone());
        }
        if let Some(service) = attr.value.downcast_ref::<Arc<RequestAuthorization>>() {
            let service: Arc<dyn AuthorizationService> = service.clone();
            return Ok(service);
        }

        Err(AuthorizationError::invalid_configuration(
            key,
            "AuthorizationService",
            short_type_name(attr.type_name),
        ))
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes: BTreeMap<&String, String> = self
            .attributes
            .iter()
            .map(|(k, v)| (k, short_type_name(v.type_name)))
            .collect();
        f.debug_struct("RequestContext")
            .field("params", &self.params)
            .field("attributes", &attributes)
            .finish()
    }
}
