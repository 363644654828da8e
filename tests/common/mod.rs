#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{json, Value};
use skillsync::{
    session::{ChallengeToken, MemoryStore, Session, SessionController},
    transport::{
        ChallengeResponse, Credentials, Endpoint, ExchangeResponse, Transport, TransportError,
    },
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::Notify;

pub fn token(claims: &Value) -> String {
    let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    format!("e30.{payload}.sig")
}

pub fn live_token(email: &str, role: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    token(&json!({ "sub": email, "role": role, "exp": exp }))
}

pub fn issued(token: String) -> ExchangeResponse {
    ExchangeResponse {
        token: Some(token),
        ..ExchangeResponse::default()
    }
}

pub fn challenge(challenge_token: &str) -> ExchangeResponse {
    ExchangeResponse {
        requires_two_factor: Some(true),
        challenge_token: Some(challenge_token.to_string()),
        ..ExchangeResponse::default()
    }
}

pub fn rejected(status: u16, message: &str) -> TransportError {
    TransportError::Http {
        status,
        message: message.to_string(),
    }
}

/// Transport answering from queued responses, optionally holding every
/// credential exchange until released.
#[derive(Default)]
pub struct ScriptedTransport {
    exchanges: Mutex<VecDeque<Result<ExchangeResponse, TransportError>>>,
    challenges: Mutex<VecDeque<Result<ChallengeResponse, TransportError>>>,
    calls: AtomicUsize,
    endpoints: Mutex<Vec<Endpoint>>,
    codes: Mutex<Vec<String>>,
    challenge_tokens: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
    challenge_gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential exchanges wait for `release.notify_one()` before answering.
    pub fn gated(release: Arc<Notify>) -> Self {
        Self {
            gate: Some(release),
            ..Self::default()
        }
    }

    /// Challenge exchanges wait for `release.notify_one()` before answering.
    pub fn gated_challenges(release: Arc<Notify>) -> Self {
        Self {
            challenge_gate: Some(release),
            ..Self::default()
        }
    }

    pub fn push_exchange(&self, response: Result<ExchangeResponse, TransportError>) -> &Self {
        self.exchanges.lock().unwrap().push_back(response);
        self
    }

    pub fn push_challenge(&self, response: Result<ChallengeResponse, TransportError>) -> &Self {
        self.challenges.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.lock().unwrap().clone()
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }

    /// Challenge tokens sent with each verification, in order.
    pub fn challenge_tokens(&self) -> Vec<String> {
        self.challenge_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange_credentials(
        &self,
        endpoint: Endpoint,
        _credentials: &Credentials,
    ) -> Result<ExchangeResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().unwrap().push(endpoint);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
    }

    async fn exchange_challenge(
        &self,
        challenge: &ChallengeToken,
        code: &str,
    ) -> Result<ChallengeResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(code.to_string());
        self.challenge_tokens
            .lock()
            .unwrap()
            .push(challenge.expose().to_string());
        if let Some(gate) = &self.challenge_gate {
            gate.notified().await;
        }
        self.challenges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transport: Arc<ScriptedTransport>,
    pub controller: SessionController,
}

impl Harness {
    pub fn new(transport: ScriptedTransport) -> Self {
        Self::with_store(transport, MemoryStore::new())
    }

    pub fn with_store(transport: ScriptedTransport, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let controller = SessionController::new(Session::new(store.clone()), transport.clone());
        controller.bootstrap();
        Self {
            store,
            transport,
            controller,
        }
    }
}
