//! Bearer credential decoding.
//!
//! Credentials are JWT-shaped strings (`header.payload[.signature]`) minted by
//! the platform API. Only the payload is decoded here; signature trust belongs
//! to the issuer and the API re-validates every request. Expiry checks fail
//! closed: anything that cannot be read counts as expired.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::{Map, Value};
use thiserror::Error;

use super::role::{is_zero, resolve, Role, RoleClaim};

/// Claims consulted (in order) for the subject identifier.
const SUBJECT_CLAIMS: [&str; 2] = ["email", "sub"];
/// Claims consulted (in order) for the role; the first one that is set wins.
const ROLE_CLAIMS: [&str; 3] = ["role", "roles", "auth"];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("token payload is not an object")]
    PayloadShape,
    #[error("token has no subject")]
    MissingSubject,
}

/// Identity derived from a successfully parsed credential. Never mutated; a
/// new login replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Identity {
    email: String,
    role: Role,
    expires_at: Option<DateTime<Utc>>,
    credential: SecretString,
}

impl Identity {
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The raw credential, for the bearer header and the session store only.
    #[must_use]
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// Local part of the email, as shown in the dashboard header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Decodes a credential into an [`Identity`].
///
/// # Errors
///
/// Returns an error if the credential has no payload segment, the payload is
/// not a base64url JSON object, or neither `email` nor `sub` holds a
/// non-empty string or non-zero number.
pub fn parse(raw: &str) -> Result<Identity, CredentialError> {
    let claims = decode_claims(raw)?;

    let email = SUBJECT_CLAIMS
        .iter()
        .find_map(|name| claims.get(*name).and_then(subject))
        .ok_or(CredentialError::MissingSubject)?;

    let role_claim = ROLE_CLAIMS
        .iter()
        .find_map(|name| claims.get(*name).and_then(RoleClaim::from_value));

    let expires_at = expiration_seconds(&claims)
        .and_then(|exp| Utc.timestamp_opt(exp.trunc() as i64, 0).single());

    Ok(Identity {
        email,
        role: resolve(role_claim.as_ref()),
        expires_at,
        credential: SecretString::from(raw.to_string()),
    })
}

/// Returns true when the credential is expired or unreadable.
#[must_use]
pub fn is_expired(raw: &str) -> bool {
    is_expired_at(raw, Utc::now())
}

/// Clock-injected variant of [`is_expired`].
///
/// A missing, zero or non-numeric `exp` counts as expired.
#[must_use]
pub fn is_expired_at(raw: &str, now: DateTime<Utc>) -> bool {
    let Ok(claims) = decode_claims(raw) else {
        return true;
    };
    match expiration_seconds(&claims) {
        Some(exp) if exp != 0.0 => exp * 1000.0 < now.timestamp_millis() as f64,
        _ => true,
    }
}

fn subject(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if !is_zero(number) => Some(number.to_string()),
        _ => None,
    }
}

// The header is never read; only the payload segment has to be present.
fn decode_claims(raw: &str) -> Result<Map<String, Value>, CredentialError> {
    let payload = raw
        .split('.')
        .nth(1)
        .filter(|payload| !payload.is_empty())
        .ok_or(CredentialError::TokenFormat)?;

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|_| CredentialError::Base64)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(claims) => Ok(claims),
        _ => Err(CredentialError::PayloadShape),
    }
}

fn expiration_seconds(claims: &Map<String, Value>) -> Option<f64> {
    claims
        .get("exp")
        .and_then(Value::as_f64)
        .filter(|exp| exp.is_finite())
}
