//! Per-action switches
//!
//! `skip_authorization` and `authorize_model` are both wildcard-plus-override
//! maps. Lookup is two-level: an exact boolean entry for the action wins,
//! otherwise the `"*"` wildcard applies. The wildcard is always set, so a
//! lookup never comes back empty.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::AuthorizationConfig;

/// Key of the wildcard entry
pub const WILDCARD: &str = "*";

/// Which switch map to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKey {
    SkipAuthorization,
    AuthorizeModel,
}

impl SwitchKey {
    /// Configuration key name
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchKey::SkipAuthorization => "skip_authorization",
            SwitchKey::AuthorizeModel => "authorize_model",
        }
    }
}

impl fmt::Display for SwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wildcard default plus per-action boolean overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSwitch {
    wildcard: bool,
    actions: BTreeMap<String, bool>,
}

impl ActionSwitch {
    /// Switch with only a wildcard
    pub fn new(wildcard: bool) -> Self {
        Self {
            wildcard,
            actions: BTreeMap::new(),
        }
    }

    /// Add a per-action override
    pub fn with(mut self, action: &str, enabled: bool) -> Self {
        self.set(action, enabled);
        self
    }

    /// Set a per-action override, or the wildcard when `action` is `"*"`
    pub fn set(&mut self, action: &str, enabled: bool) {
        if action == WILDCARD {
            self.wildcard = enabled;
        } else {
            self.actions.insert(action.to_string(), enabled);
        }
    }

    pub fn wildcard(&self) -> bool {
        self.wildcard
    }

    /// Per-action override, if any
    pub fn override_for(&self, action: &str) -> Option<bool> {
        self.actions.get(action).copied()
    }

    /// Exact entry if present, otherwise the wildcard
    pub fn decide(&self, action: &str) -> bool {
        self.override_for(action).unwrap_or(self.wildcard)
    }

    fn from_raw(raw: BTreeMap<String, serde_json::Value>, default_wildcard: bool) -> Self {
        let mut switch = Self::new(default_wildcard);
        for (action, value) in raw {
            if action == WILDCARD {
                switch.wildcard = truthy(&value);
            } else if let serde_json::Value::Bool(enabled) = value {
                switch.actions.insert(action, enabled);
            }
        }
        switch
    }

    /// Deserialize with a wildcard default of `false` when `"*"` is missing
    pub fn deserialize_default_off<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = deserializer.deserialize_map(RawSwitchVisitor)?;
        Ok(Self::from_raw(raw, false))
    }

    /// Deserialize with a wildcard default of `true` when `"*"` is missing
    pub fn deserialize_default_on<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = deserializer.deserialize_map(RawSwitchVisitor)?;
        Ok(Self::from_raw(raw, true))
    }
}

impl Serialize for ActionSwitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.actions.len() + 1))?;
        map.serialize_entry(WILDCARD, &self.wildcard)?;
        for (action, enabled) in &self.actions {
            map.serialize_entry(action, enabled)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ActionSwitch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::deserialize_default_off(deserializer)
    }
}

struct RawSwitchVisitor;

impl<'de> Visitor<'de> for RawSwitchVisitor {
    type Value = BTreeMap<String, serde_json::Value>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of action names to booleans")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut raw = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            raw.insert(key, value);
        }
        Ok(raw)
    }
}

/// Loose truthiness used for the wildcard entry
fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !(s.is_empty() || s == "0"),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// Decide a switch for an action against a configuration
pub fn decide(action: &str, key: SwitchKey, config: &AuthorizationConfig) -> bool {
    let switch = match key {
        SwitchKey::SkipAuthorization => &config.skip_authorization,
        SwitchKey::AuthorizeModel => &config.authorize_model,
    };
    switch.decide(action)
}
