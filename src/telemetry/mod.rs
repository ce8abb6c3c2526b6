//! Tracing subscriber setup
//!
//! Installs a layered subscriber:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falling back to logging.level)
//!   └── Fmt Layer (console output, optionally JSON)
//! ```
//!
//! Authorization events carry `authz.action`, `authz.resource_type` and
//! `authz.decision` fields. Subject identifiers are never recorded.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during subscriber initialization
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Build the filter: RUST_LOG if set, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| TelemetryError::InvalidFilter(e.to_string())),
    }
}

/// Initialize the global tracing subscriber
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter = env_filter(config)?;

    let result = if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true);
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
