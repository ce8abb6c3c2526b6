//! Configuration loader with environment variable expansion

use super::{AuthorizationConfig, ConfigError};
use lazy_static::lazy_static;
use regex_lite::Regex;
use std::path::Path;

lazy_static! {
    // ${VAR} or ${VAR:-default}
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AuthorizationConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from YAML text, expanding environment variables
    pub fn parse(content: &str) -> Result<AuthorizationConfig, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let config: AuthorizationConfig = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` and `${VAR:-default}`.
    ///
    /// An unset variable without a default keeps its placeholder.
    fn expand_env_vars(content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut last_match = 0;

        for cap in ENV_VAR.captures_iter(content) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            result.push_str(&content[last_match..full_match.start()]);

            match (std::env::var(&cap[1]), cap.get(2)) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default.as_str()),
                (Err(_), None) => result.push_str(full_match.as_str()),
            }

            last_match = full_match.end();
        }

        result.push_str(&content[last_match..]);
        result
    }
}
