//! Authorization roles and the claim-to-role mapping.
//!
//! The dashboard only distinguishes learners from admins. The issuing authority
//! does not agree on a single claim shape, so the role claim may be a string,
//! a list of strings, or missing entirely. Anything that is not recognizably
//! an admin claim maps to `Learner`; `Guest` is never derived from a claim, it
//! is the absence of a session.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Marker searched for (case-insensitively) inside a role claim.
const ADMIN_MARKER: &str = "admin";

/// Closed set of roles a dashboard session can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No session.
    Guest,
    /// Default role for any authenticated subject.
    Learner,
    /// Course and user administration.
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Learner => "learner",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw role claim as found in a credential payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleClaim {
    Single(String),
    Many(Vec<String>),
}

impl RoleClaim {
    /// Builds a claim from a decoded JSON value.
    ///
    /// Returns `None` for values that do not count as set: `null`, `false`,
    /// zero and the empty string. Non-string scalars keep their textual form.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::Number(number) if is_zero(number) => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(Self::Single(text.clone())),
            Value::Array(items) => Some(Self::Many(items.iter().map(value_text).collect())),
            other => Some(Self::Single(other.to_string())),
        }
    }
}

pub(crate) fn is_zero(number: &Number) -> bool {
    number.as_f64().is_some_and(|value| value == 0.0)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Maps a role claim to a role. Total: every input yields `Learner` or `Admin`.
///
/// Only the first element of a list claim is inspected.
#[must_use]
pub fn resolve(claim: Option<&RoleClaim>) -> Role {
    let raw = match claim {
        None => return Role::Learner,
        Some(RoleClaim::Single(value)) => value.as_str(),
        Some(RoleClaim::Many(values)) => match values.first() {
            Some(value) => value.as_str(),
            None => return Role::Learner,
        },
    };

    if raw.to_lowercase().contains(ADMIN_MARKER) {
        Role::Admin
    } else {
        Role::Learner
    }
}
