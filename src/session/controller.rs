//! Session controller: bootstrap, login, registration, second-factor
//! verification and logout.
//!
//! Flow Overview:
//! - `Session` owns the store and the published `SessionState`. It is built
//!   once at process start and lives for the whole process. It is also the
//!   logout handler and credential source handed to the transport.
//! - `SessionController` pairs a `Session` with a `Transport` and runs the
//!   network-bound operations.
//! - Every `logout` advances an epoch. An operation captures the epoch when it
//!   starts and its results are discarded if the epoch moved, so a request that
//!   resolves after logout never resurrects the session.
//!
//! Credentials, passwords, challenge tokens and codes are never logged.

use secrecy::{ExposeSecret, SecretString};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    credential::{self, Identity},
    error::{SessionError, SessionResult},
    role::Role,
    state::{ChallengeToken, LoginOutcome, SessionState},
    store::SessionStore,
};
use crate::transport::{
    CredentialSource, Credentials, Endpoint, Transport, UnauthorizedHandler,
};

const MISSING_CREDENTIALS: &str = "Email and password are required";
const MISSING_CODE: &str = "Verification code is required";
const MISSING_TOKEN: &str = "No token returned from server";
const INVALID_TOKEN: &str = "Invalid token payload";
const MISSING_CHALLENGE: &str = "Second factor required but no challenge was issued";
const NO_PENDING_CHALLENGE: &str = "No verification is pending. Please sign in again.";
const CHALLENGE_REPLACED: &str = "The verification was cancelled. Please sign in again.";
const SIGNED_OUT: &str = "You were signed out while the request was in progress.";
const BUSY: &str = "Another request is already in progress";

struct Shared {
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

/// Process-wide session state plus its durable slot.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Creates the session in the bootstrapping state.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            shared: Arc::new(Shared {
                store,
                state,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Restores the session from the store. Never fails: any problem with the
    /// stored credential clears it and resolves to guest.
    pub fn bootstrap(&self) {
        self.shared.state.send_modify(|state| state.bootstrapping = true);
        let identity = self.restore();
        self.shared.state.send_modify(|state| {
            state.identity = identity;
            state.bootstrapping = false;
        });
    }

    fn restore(&self) -> Option<Identity> {
        let raw = match self.shared.store.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored session");
                self.clear_store();
                return None;
            }
            Err(err) => {
                warn!(error = %err, "failed to read stored session");
                self.clear_store();
                return None;
            }
        };

        if credential::is_expired(&raw) {
            info!("stored session expired");
            self.clear_store();
            return None;
        }

        match credential::parse(&raw) {
            Ok(identity) => {
                info!(email = identity.email(), role = %identity.role(), "session restored");
                Some(identity)
            }
            Err(err) => {
                warn!(error = %err, "discarding unreadable stored session");
                self.clear_store();
                None
            }
        }
    }

    /// Clears the store and resets to guest. Idempotent and infallible; safe
    /// to call while another operation is in flight.
    pub fn logout(&self) {
        self.shared.state.send_modify(|state| {
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            self.clear_store();
            state.identity = None;
            state.pending_two_factor = None;
            state.last_error = None;
            state.bootstrapping = false;
        });
        info!("session signed out");
    }

    fn clear_store(&self) {
        if let Err(err) = self.shared.store.clear() {
            warn!(error = %err, "failed to clear stored session");
        }
    }

    pub(crate) fn pending_challenge(&self) -> Option<ChallengeToken> {
        self.shared.state.borrow().pending_two_factor.clone()
    }

    /// Marks a submission as started and returns the epoch it belongs to.
    fn begin_submit(&self, discard_challenge: bool) -> SessionResult<u64> {
        let mut started = None;
        self.shared.state.send_modify(|state| {
            if state.submitting {
                state.last_error = Some(BUSY.to_string());
                return;
            }
            state.submitting = true;
            state.last_error = None;
            if discard_challenge {
                state.pending_two_factor = None;
            }
            started = Some(self.shared.epoch.load(Ordering::SeqCst));
        });
        started.ok_or_else(|| SessionError::state(BUSY))
    }

    fn finish_submit(&self, error: Option<&SessionError>) {
        if let Some(err) = error {
            warn!(kind = err.kind(), "session request failed");
        }
        self.shared.state.send_modify(|state| {
            state.submitting = false;
            state.last_error = error.map(ToString::to_string);
        });
    }

    fn record_error(&self, error: &SessionError) {
        self.shared
            .state
            .send_modify(|state| state.last_error = Some(error.to_string()));
    }

    fn install_challenge(&self, epoch: u64, challenge: ChallengeToken) -> SessionResult<()> {
        let mut outcome = Ok(());
        self.shared.state.send_if_modified(|state| {
            if self.shared.epoch.load(Ordering::SeqCst) != epoch {
                outcome = Err(SessionError::state(SIGNED_OUT));
                return false;
            }
            state.pending_two_factor = Some(challenge);
            true
        });
        outcome
    }

    /// Persists and installs `identity` unless a logout happened since `epoch`
    /// or, for verification, the challenge is no longer the pending one.
    fn install_identity(
        &self,
        epoch: u64,
        identity: Identity,
        challenge: Option<&ChallengeToken>,
    ) -> SessionResult<()> {
        let mut outcome = Ok(());
        self.shared.state.send_if_modified(|state| {
            if self.shared.epoch.load(Ordering::SeqCst) != epoch {
                outcome = Err(SessionError::state(SIGNED_OUT));
                return false;
            }
            if let Some(expected) = challenge {
                let still_pending = state
                    .pending_two_factor
                    .as_ref()
                    .is_some_and(|pending| pending.same_as(expected));
                if !still_pending {
                    outcome = Err(SessionError::state(CHALLENGE_REPLACED));
                    return false;
                }
            }
            if let Err(err) = self.shared.store.save(identity.credential().expose_secret()) {
                outcome = Err(SessionError::Storage(err));
                return false;
            }
            state.identity = Some(identity);
            state.pending_two_factor = None;
            true
        });
        outcome
    }

    fn update(&self, modify: impl FnOnce(&mut SessionState)) {
        self.shared.state.send_modify(modify);
    }
}

impl UnauthorizedHandler for Session {
    fn on_unauthorized(&self) {
        self.logout();
    }
}

impl CredentialSource for Session {
    fn bearer(&self) -> Option<SecretString> {
        self.shared
            .state
            .borrow()
            .identity
            .as_ref()
            .map(|identity| identity.credential().clone())
    }
}

/// Runs session operations against a transport.
#[derive(Clone)]
pub struct SessionController {
    session: Session,
    transport: Arc<dyn Transport>,
}

impl SessionController {
    #[must_use]
    pub fn new(session: Session, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.session.state().role()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.state().is_authenticated()
    }

    pub fn bootstrap(&self) {
        self.session.bootstrap();
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Exchanges email and password for a session. Starting a login discards
    /// any pending challenge.
    ///
    /// # Errors
    /// `Validation` for empty input (no request is made), `Protocol` when the
    /// response carries no usable credential or challenge, `State` when
    /// another request is in progress or a logout won the race, `Transport`
    /// and `Storage` passed through.
    pub async fn login(&self, email: &str, password: &SecretString) -> SessionResult<LoginOutcome> {
        let epoch = self.session.begin_submit(true)?;
        let result = self.login_inner(email, password, epoch).await;
        self.session.finish_submit(result.as_ref().err());
        result
    }

    async fn login_inner(
        &self,
        email: &str,
        password: &SecretString,
        epoch: u64,
    ) -> SessionResult<LoginOutcome> {
        let credentials = validate_credentials(email, password)?;
        let response = self
            .transport
            .exchange_credentials(Endpoint::Login, &credentials)
            .await?;

        if response.requires_two_factor() {
            let challenge = response
                .challenge_token
                .filter(|token| !token.is_empty())
                .map(ChallengeToken::new)
                .ok_or_else(|| SessionError::protocol(MISSING_CHALLENGE))?;
            self.session.install_challenge(epoch, challenge.clone())?;
            info!(email = credentials.email.as_str(), "second factor required");
            return Ok(LoginOutcome::ChallengeRequired(challenge));
        }

        let identity = self.accept_credential(response.token, epoch, None)?;
        Ok(LoginOutcome::Authenticated(identity))
    }

    /// Creates an account and signs in. Registration never asks for a second
    /// factor.
    ///
    /// # Errors
    /// Same as [`SessionController::login`].
    pub async fn register(&self, email: &str, password: &SecretString) -> SessionResult<Identity> {
        let epoch = self.session.begin_submit(false)?;
        let result = self.register_inner(email, password, epoch).await;
        self.session.finish_submit(result.as_ref().err());
        result
    }

    async fn register_inner(
        &self,
        email: &str,
        password: &SecretString,
        epoch: u64,
    ) -> SessionResult<Identity> {
        let credentials = validate_credentials(email, password)?;
        let response = self
            .transport
            .exchange_credentials(Endpoint::Register, &credentials)
            .await?;
        self.accept_credential(response.token, epoch, None)
    }

    /// Completes a pending challenge. On failure the challenge stays pending so
    /// the user can retry.
    ///
    /// # Errors
    /// `State` when no challenge is pending, `Validation` for an empty code,
    /// otherwise as [`SessionController::login`].
    pub async fn verify_two_factor(&self, code: &str) -> SessionResult<Identity> {
        let Some(challenge) = self.session.pending_challenge() else {
            let err = SessionError::state(NO_PENDING_CHALLENGE);
            self.session.record_error(&err);
            return Err(err);
        };

        let epoch = self.session.begin_submit(false)?;
        let result = self.verify_inner(&challenge, code, epoch).await;
        self.session.finish_submit(result.as_ref().err());
        result
    }

    async fn verify_inner(
        &self,
        challenge: &ChallengeToken,
        code: &str,
        epoch: u64,
    ) -> SessionResult<Identity> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SessionError::validation(MISSING_CODE));
        }
        let response = self.transport.exchange_challenge(challenge, code).await?;
        self.accept_credential(response.token, epoch, Some(challenge))
    }

    /// Drops the pending challenge, if any.
    pub fn cancel_two_factor(&self) {
        self.session.update(|state| {
            state.pending_two_factor = None;
            state.last_error = None;
        });
    }

    pub fn clear_error(&self) {
        self.session.update(|state| state.last_error = None);
    }

    fn accept_credential(
        &self,
        token: Option<String>,
        epoch: u64,
        challenge: Option<&ChallengeToken>,
    ) -> SessionResult<Identity> {
        let raw = token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SessionError::protocol(MISSING_TOKEN))?;
        let identity = credential::parse(&raw).map_err(|err| {
            warn!(error = %err, "rejected credential payload");
            SessionError::protocol(INVALID_TOKEN)
        })?;

        self.session
            .install_identity(epoch, identity.clone(), challenge)?;
        info!(email = identity.email(), role = %identity.role(), "session established");
        Ok(identity)
    }
}

fn validate_credentials(email: &str, password: &SecretString) -> SessionResult<Credentials> {
    let email = email.trim();
    if email.is_empty() || password.expose_secret().is_empty() {
        return Err(SessionError::validation(MISSING_CREDENTIALS));
    }
    Ok(Credentials {
        email: email.to_string(),
        password: password.clone(),
    })
}
