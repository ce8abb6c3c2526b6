//! Action name resolution
//!
//! Maps the routed action name of a request to the name policies see.
//! The map is kept as raw JSON values because it usually comes from a YAML
//! file, and a non-string entry has to be reported rather than guessed at.

use crate::error::{AuthorizationError, AuthorizationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Rename table from routed action names to authorization action names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionMap {
    entries: BTreeMap<String, serde_json::Value>,
}

impl ActionMap {
    /// Create an empty action map
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename `routed` to `authorization_action`
    pub fn with(mut self, routed: &str, authorization_action: &str) -> Self {
        self.entries.insert(
            routed.to_string(),
            serde_json::Value::String(authorization_action.to_string()),
        );
        self
    }

    /// Insert a raw entry, as a dynamically built configuration would
    pub fn insert_raw(&mut self, routed: &str, value: serde_json::Value) {
        self.entries.insert(routed.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a routed action name; see [`resolve_action`]
    pub fn resolve(&self, routed: &str) -> AuthorizationResult<String> {
        resolve_action(routed, self)
    }

    /// Check every entry resolves, reporting the first offender
    pub fn validate(&self) -> AuthorizationResult<()> {
        for routed in self.entries.keys() {
            self.resolve(routed)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for ActionMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        }
    }
}

/// Resolve the authorization action for a routed action.
///
/// - no entry (or a null entry): the routed name unchanged
/// - string entry: that string
/// - anything else: [`AuthorizationError::InvalidConfiguration`]
pub fn resolve_action(routed: &str, action_map: &ActionMap) -> AuthorizationResult<String> {
    match action_map.entries.get(routed) {
        None | Some(serde_json::Value::Null) => Ok(routed.to_string()),
        Some(serde_json::Value::String(mapped)) => {
            debug!(routed = %routed, authz.action = %mapped, "Action renamed by action map");
            Ok(mapped.clone())
        }
        Some(other) => Err(AuthorizationError::invalid_configuration(
            format!("action_map.{}", routed),
            "string",
            json_type_name(other),
        )),
    }
}

/// Name of a JSON value's type, for configuration errors
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
