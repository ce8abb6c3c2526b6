//! Configuration module for Komainu
//!
//! Handles loading and parsing of YAML authorization settings with support
//! for environment variable expansion and validation.
//!
//! # Example
//!
//! ```yaml
//! identity_attribute: identity
//! service_attribute: authorization
//! authorization_event: Controller.initialize
//! skip_authorization:
//!   "*": false
//!   login: true
//! authorize_model:
//!   "*": true
//!   index: false
//! action_map:
//!   index: list
//! logging:
//!   level: info
//!   json: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::action::ActionMap;
use crate::gate::ActionSwitch;

mod loader;

pub use loader::ConfigLoader;

/// Default lifecycle event that triggers automatic authorization
pub const DEFAULT_AUTHORIZATION_EVENT: &str = "Controller.initialize";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Authorization settings, immutable for the life of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Request attribute holding the identity. Default: "identity"
    #[serde(default = "default_identity_attribute", alias = "identityAttribute")]
    pub identity_attribute: String,

    /// Request attribute holding the authorization service. Default: "authorization"
    #[serde(default = "default_service_attribute", alias = "serviceAttribute")]
    pub service_attribute: String,

    /// Lifecycle event that runs automatic authorization.
    /// Default: "Controller.initialize"
    #[serde(
        default = "default_authorization_event",
        alias = "authorizationEvent"
    )]
    pub authorization_event: String,

    /// Actions that skip authorization. Default: `{"*": false}`
    #[serde(
        default = "default_skip_authorization",
        alias = "skipAuthorization",
        deserialize_with = "ActionSwitch::deserialize_default_off"
    )]
    pub skip_authorization: ActionSwitch,

    /// Actions whose default model is authorized automatically.
    /// Default: `{"*": true}`
    #[serde(
        default = "default_authorize_model",
        alias = "authorizeModel",
        deserialize_with = "ActionSwitch::deserialize_default_on"
    )]
    pub authorize_model: ActionSwitch,

    /// Routed action name to authorization action name
    #[serde(default, alias = "actionMap")]
    pub action_map: ActionMap,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            identity_attribute: default_identity_attribute(),
            service_attribute: default_service_attribute(),
            authorization_event: default_authorization_event(),
            skip_authorization: default_skip_authorization(),
            authorize_model: default_authorize_model(),
            action_map: ActionMap::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AuthorizationConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        ConfigLoader::parse(yaml)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity_attribute.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "identity_attribute cannot be empty".into(),
            ));
        }

        if self.service_attribute.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_attribute cannot be empty".into(),
            ));
        }

        if self.identity_attribute == self.service_attribute {
            return Err(ConfigError::ValidationError(format!(
                "identity_attribute and service_attribute must differ (both '{}')",
                self.identity_attribute
            )));
        }

        if self.authorization_event.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "authorization_event cannot be empty".into(),
            ));
        }

        self.action_map
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level '{}': must be trace, debug, info, warn or error",
                    other
                )))
            }
        }

        Ok(())
    }
}

fn default_identity_attribute() -> String {
    "identity".to_string()
}

fn default_service_attribute() -> String {
    "authorization".to_string()
}

fn default_authorization_event() -> String {
    DEFAULT_AUTHORIZATION_EVENT.to_string()
}

fn default_skip_authorization() -> ActionSwitch {
    ActionSwitch::new(false)
}

fn default_authorize_model() -> ActionSwitch {
    ActionSwitch::new(true)
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback level when RUST_LOG is unset. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output. Default: false
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.identity_attribute, "identity");
        assert_eq!(config.service_attribute, "authorization");
        assert_eq!(config.authorization_event, "Controller.initialize");
        assert!(!config.skip_authorization.wildcard());
        assert!(config.authorize_model.wildcard());
        assert!(config.action_map.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config: AuthorizationConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AuthorizationConfig::default());
    }

    #[test]
    fn test_camel_case_aliases() {
        let yaml = r#"
identityAttribute: user
skipAuthorization:
  login: true
authorizeModel:
  index: false
actionMap:
  index: list
"#;
        let config: AuthorizationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.identity_attribute, "user");
        assert!(config.skip_authorization.decide("login"));
        assert!(!config.skip_authorization.wildcard());
        assert!(!config.authorize_model.decide("index"));
        assert!(config.authorize_model.wildcard());
        assert_eq!(config.action_map.resolve("index").unwrap(), "list");
    }

    #[test]
    fn test_validation_rejects_shared_attribute() {
        let config = AuthorizationConfig {
            service_attribute: "identity".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_event() {
        let config = AuthorizationConfig {
            authorization_event: " ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_string_action_map_entry() {
        let mut config = AuthorizationConfig::default();
        config.action_map.insert_raw("edit", serde_json::json!(42));
        match config.validate() {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("action_map.edit")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let mut config = AuthorizationConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }
}
