//! Authorization errors
//!
//! Every failure raised by the enforcer propagates to the host untouched.
//! The host decides how to render each kind; [`AuthorizationError::status_code`]
//! gives the conventional HTTP status class.

use thiserror::Error;

/// Authorization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Identity is not authorized to perform `{action}` on `{resource_type}`")]
    Denied {
        action: String,
        resource_type: String,
    },

    #[error("The request has no identity under the `{attribute}` attribute")]
    MissingIdentity { attribute: String },

    #[error("The request has no authorization service under the `{attribute}` attribute")]
    MissingService { attribute: String },

    #[error("Invalid configuration for `{key}`: expected {expected}, found {actual}")]
    InvalidConfiguration {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("No policy registered for `{resource_type}`")]
    MissingPolicy { resource_type: String },

    #[error("Policy for `{resource_type}` has no scope for `{action}`")]
    MissingScope {
        action: String,
        resource_type: String,
    },

    #[error("Scope for `{action}` returned {actual}, expected {expected}")]
    ScopeMismatch {
        action: String,
        expected: String,
        actual: String,
    },

    #[error("Action `{action}` completed without an authorization check")]
    AuthorizationRequired { action: String },

    #[error("Policy backend error: {0}")]
    Backend(String),
}

impl AuthorizationError {
    /// Build an [`AuthorizationError::InvalidConfiguration`]
    pub fn invalid_configuration(
        key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            key: key.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// HTTP status class the host should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Denied { .. } => 403,
            Self::MissingIdentity { .. } => 401,
            Self::Backend(_) => 502,
            Self::MissingService { .. }
            | Self::InvalidConfiguration { .. }
            | Self::MissingPolicy { .. }
            | Self::MissingScope { .. }
            | Self::ScopeMismatch { .. }
            | Self::AuthorizationRequired { .. } => 500,
        }
    }

    /// Whether this is a setup error rather than a request outcome.
    ///
    /// Setup errors should not be shown to end users with request detail.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingService { .. }
                | Self::InvalidConfiguration { .. }
                | Self::MissingPolicy { .. }
                | Self::MissingScope { .. }
                | Self::ScopeMismatch { .. }
        )
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Denied { .. } => "denied",
            Self::MissingIdentity { .. } => "missing_identity",
            Self::MissingService { .. } => "missing_service",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::MissingPolicy { .. } => "missing_policy",
            Self::MissingScope { .. } => "missing_scope",
            Self::ScopeMismatch { .. } => "scope_mismatch",
            Self::AuthorizationRequired { .. } => "authorization_required",
            Self::Backend(_) => "backend",
        }
    }
}

/// Result alias used across the crate
pub type AuthorizationResult<T> = Result<T, AuthorizationError>;
