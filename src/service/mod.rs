//! Per-request authorization bookkeeping
//!
//! The service is the single source of truth for whether a request's
//! authorization was handled. State only moves forward:
//!
//! ```text
//! Unchecked ──authorize ok──▶ Authorized
//!     └──────skip───────────▶ Skipped
//! ```
//!
//! A denial raises instead of transitioning. The first terminal state wins.

use crate::error::{AuthorizationError, AuthorizationResult};
use parking_lot::Mutex;
use std::fmt;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Authorization state of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationState {
    #[default]
    Unchecked,
    Authorized,
    Skipped,
}

impl AuthorizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationState::Unchecked => "unchecked",
            AuthorizationState::Authorized => "authorized",
            AuthorizationState::Skipped => "skipped",
        }
    }

    /// Whether a check or an explicit skip happened
    pub fn is_handled(&self) -> bool {
        !matches!(self, AuthorizationState::Unchecked)
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization service trait
#[cfg_attr(test, automock)]
pub trait AuthorizationService: Send + Sync {
    /// Record that authorization was explicitly skipped
    fn skip_authorization(&self);

    /// Record that an authorization check succeeded
    fn authorization_checked(&self);

    /// Current state
    fn state(&self) -> AuthorizationState;
}

/// Request-scoped authorization service
#[derive(Debug, Default)]
pub struct RequestAuthorization {
    state: Mutex<AuthorizationState>,
}

impl RequestAuthorization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`AuthorizationError::AuthorizationRequired`] if nothing
    /// was checked or skipped for `action`
    pub fn ensure_handled(&self, action: &str) -> AuthorizationResult<()> {
        ensure_handled(self, action)
    }

    fn transition(&self, next: AuthorizationState) {
        let mut state = self.state.lock();
        let current = *state;
        if current == AuthorizationState::Unchecked {
            *state = next;
        } else if current != next {
            warn!(
                authz.state = %current,
                authz.ignored = %next,
                "Authorization already settled for this request"
            );
        }
    }
}

impl AuthorizationService for RequestAuthorization {
    fn skip_authorization(&self) {
        self.transition(AuthorizationState::Skipped);
    }

    fn authorization_checked(&self) {
        self.transition(AuthorizationState::Authorized);
    }

    fn state(&self) -> AuthorizationState {
        *self.state.lock()
    }
}

/// End-of-request assertion over any service
pub fn ensure_handled<S>(service: &S, action: &str) -> AuthorizationResult<()>
where
    S: AuthorizationService + ?Sized,
{
    if service.state().is_handled() {
        Ok(())
    } else {
        Err(AuthorizationError::AuthorizationRequired {
            action: action.to_string(),
        })
    }
}
