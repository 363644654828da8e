//! HTTP transport backed by `reqwest`, with a fixed request timeout and
//! sanitized error bodies so API messages can be shown to users as-is.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    ChallengeResponse, CredentialSource, Credentials, Endpoint, ExchangeResponse, Transport,
    TransportError, UnauthorizedHandler,
};
use crate::{config::ClientConfig, session::ChallengeToken};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialSource>,
    on_unauthorized: Arc<dyn UnauthorizedHandler>,
}

impl HttpTransport {
    /// Builds the transport. `on_unauthorized` is the only handler ever
    /// notified of authorization failures.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialSource>,
        on_unauthorized: Arc<dyn UnauthorizedHandler>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| TransportError::Config(format!("Failed to build client: {err}")))?;

        Ok(Self {
            client,
            config: config.clone(),
            credentials,
            on_unauthorized,
        })
    }

    /// Authenticated GET returning decoded JSON.
    ///
    /// # Errors
    /// Returns [`TransportError::Unauthorized`] (after notifying the handler)
    /// on 401, or the usual network/HTTP/decode errors.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.send_authorized(self.request(Method::GET, path)).await?;
        handle_json_response(response).await
    }

    /// Authenticated POST with a JSON body returning decoded JSON.
    ///
    /// # Errors
    /// Same as [`HttpTransport::get_json`], plus body encoding failures.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| TransportError::Serialization(format!("Failed to encode request: {err}")))?;
        let builder = self
            .request(Method::POST, path)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        let response = self.send_authorized(builder).await?;
        handle_json_response(response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = build_url_with_base(&self.config.api_base_url, path);
        self.client.request(method, url)
    }

    async fn send_authorized(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let builder = match self.credentials.bearer() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };
        let response = builder.send().await.map_err(map_request_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("API rejected the session credential; signing out");
            self.on_unauthorized.on_unauthorized();
            return Err(TransportError::Unauthorized);
        }
        Ok(response)
    }

    async fn post_exchange<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;
        handle_json_response(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange_credentials(
        &self,
        endpoint: Endpoint,
        credentials: &Credentials,
    ) -> Result<ExchangeResponse, TransportError> {
        let path = match endpoint {
            Endpoint::Login => &self.config.login_path,
            Endpoint::Register => &self.config.register_path,
        };
        debug!(?endpoint, "exchanging credentials");
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        self.post_exchange(path, &body).await
    }

    async fn exchange_challenge(
        &self,
        challenge: &ChallengeToken,
        code: &str,
    ) -> Result<ChallengeResponse, TransportError> {
        debug!("exchanging second-factor challenge");
        let body = json!({
            "challengeToken": challenge.expose(),
            "code": code,
        });
        self.post_exchange(&self.config.two_factor_path, &body).await
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps client errors into user-facing variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        TransportError::Serialization(format!("Failed to build request: {err}"))
    } else {
        TransportError::Network(format!("Unable to reach the server: {err}"))
    }
}

/// Parses JSON responses and surfaces HTTP errors with sanitized bodies.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| TransportError::Parse(format!("Failed to decode response: {err}")))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Http {
            status: status.as_u16(),
            message: sanitize_body(&body),
        })
    }
}

/// Trims and truncates error bodies for display.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
