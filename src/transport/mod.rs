//! Transport seam between the session controller and the platform API.
//!
//! The controller only needs two exchanges (credentials for a token, a
//! challenge code for a token). Authenticated requests for the rest of the
//! dashboard go through [`HttpTransport`], which attaches the current
//! credential as a bearer header and reports authorization failures to a
//! single handler registered at construction.
//!
//! Request and response payloads carry passwords, codes and tokens; they must
//! never be logged.

mod http;

pub use http::{HttpTransport, APP_USER_AGENT};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::session::ChallengeToken;

#[derive(Clone, Debug, Error)]
pub enum TransportError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
    #[error("Session expired. Please sign in again.")]
    Unauthorized,
}

/// Credential exchange endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
}

/// Email and password as submitted by the user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Body returned by the login and register endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "requires2fa")]
    pub requires_two_factor: Option<bool>,
    #[serde(default)]
    pub challenge_token: Option<String>,
}

impl ExchangeResponse {
    #[must_use]
    pub fn requires_two_factor(&self) -> bool {
        self.requires_two_factor.unwrap_or(false)
    }
}

/// Body returned by the second-factor endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Exchanges email and password for a credential or a challenge.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be decoded.
    async fn exchange_credentials(
        &self,
        endpoint: Endpoint,
        credentials: &Credentials,
    ) -> Result<ExchangeResponse, TransportError>;

    /// Exchanges a pending challenge and its code for a credential.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be decoded.
    async fn exchange_challenge(
        &self,
        challenge: &ChallengeToken,
        code: &str,
    ) -> Result<ChallengeResponse, TransportError>;
}

/// Called when an authenticated request is rejected as unauthorized.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// Supplies the credential attached to authenticated requests.
pub trait CredentialSource: Send + Sync {
    fn bearer(&self) -> Option<SecretString>;
}
