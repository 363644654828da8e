//! Session state exposed to consumers.
//!
//! `SessionState` is owned by the controller and published through a watch
//! channel; everything else reads snapshots. It is never persisted: the only
//! durable piece is the raw credential in the session store.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::{credential::Identity, role::Role};

/// Opaque reference to an in-flight second-factor verification.
#[derive(Clone)]
pub struct ChallengeToken(SecretString);

impl ChallengeToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl fmt::Debug for ChallengeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChallengeToken([REDACTED])")
    }
}

/// Result of a successful `login`.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// No second factor was requested; the identity is installed.
    Authenticated(Identity),
    /// The API asked for a second factor; the challenge is pending.
    ChallengeRequired(ChallengeToken),
}

impl LoginOutcome {
    #[must_use]
    pub fn requires_two_factor(&self) -> bool {
        matches!(self, Self::ChallengeRequired(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub bootstrapping: bool,
    pub pending_two_factor: Option<ChallengeToken>,
    pub submitting: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    /// State before bootstrap has resolved.
    pub(crate) fn uninitialized() -> Self {
        Self {
            identity: None,
            bootstrapping: true,
            pending_two_factor: None,
            submitting: false,
            last_error: None,
        }
    }

    /// Resolved state with no session.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            bootstrapping: false,
            ..Self::uninitialized()
        }
    }

    /// Resolved state holding `identity`.
    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::guest()
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Role of the current session, `Guest` when there is none.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity.as_ref().map_or(Role::Guest, Identity::role)
    }

    /// Name shown in the dashboard header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.identity.as_ref().map_or("Guest", Identity::display_name)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::uninitialized()
    }
}
