#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::{bail, Result};
use common::{challenge, issued, live_token, rejected, token, Harness, ScriptedTransport};
use secrecy::SecretString;
use serde_json::json;
use skillsync::{
    guard::{decide, routes, Decision},
    session::{
        is_expired, parse, resolve, LoginOutcome, MemoryStore, Role, RoleClaim, SessionError,
        SessionStore,
    },
    transport::{ChallengeResponse, Endpoint, TransportError},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::Notify, time::timeout};

fn password() -> SecretString {
    SecretString::from("correct horse".to_string())
}

#[test]
fn undecodable_credentials_fail_closed() {
    for raw in ["", "abc", "a.b", "e30.!!!.sig", "e30.bm90LWpzb24.sig", ".e30.sig"] {
        assert!(parse(raw).is_err(), "{raw:?} should not parse");
        assert!(is_expired(raw), "{raw:?} should count as expired");
    }
}

#[test]
fn admin_substring_in_any_case_resolves_admin() {
    for claim in ["admin", "ADMIN", "ROLE_Admin", "superadministrator"] {
        let claim = RoleClaim::Single(claim.to_string());
        assert_eq!(resolve(Some(&claim)), Role::Admin);
    }
    for claim in ["learner", "ROLE_USER", "adm", ""] {
        let claim = RoleClaim::Single(claim.to_string());
        assert_eq!(resolve(Some(&claim)), Role::Learner);
    }
    assert_eq!(resolve(None), Role::Learner);
}

#[test]
fn bootstrap_without_credential_redirects_to_login() {
    let harness = Harness::new(ScriptedTransport::new());
    let state = harness.controller.state();

    assert!(!state.bootstrapping);
    assert_eq!(
        decide(&state, None, "/enrolled"),
        Decision::RedirectToLogin {
            return_path: "/enrolled".to_string()
        }
    );
}

#[test]
fn bootstrap_restores_stored_admin() {
    let stored = live_token("a@b.com", "ADMIN");
    let harness = Harness::with_store(ScriptedTransport::new(), MemoryStore::with_credential(stored));

    let state = harness.controller.state();
    assert_eq!(harness.controller.role(), Role::Admin);
    assert_eq!(decide(&state, Some(&[Role::Admin]), "/admin/users"), Decision::Allow);
}

#[tokio::test]
async fn login_without_second_factor_allows_access() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(issued(live_token("learner@b.com", "learner"))));
    let harness = Harness::new(transport);

    let outcome = harness.controller.login("learner@b.com", &password()).await?;
    assert!(matches!(outcome, LoginOutcome::Authenticated(ref id) if id.email() == "learner@b.com"));

    let state = harness.controller.state();
    assert!(state.identity.is_some());
    assert!(!state.submitting);
    assert_eq!(decide(&state, None, "/catalog"), Decision::Allow);
    assert!(harness.store.load()?.is_some());
    assert_eq!(harness.transport.endpoints(), vec![Endpoint::Login]);
    Ok(())
}

#[tokio::test]
async fn second_factor_survives_invalid_code_and_completes() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport
        .push_exchange(Ok(challenge("challenge-1")))
        .push_challenge(Err(rejected(400, "Invalid verification code")))
        .push_challenge(Ok(ChallengeResponse {
            token: Some(live_token("a@b.com", "learner")),
        }));
    let harness = Harness::new(transport);
    let controller = &harness.controller;

    let outcome = controller.login("a@b.com", &password()).await?;
    assert!(outcome.requires_two_factor());
    let state = controller.state();
    assert!(state.pending_two_factor.is_some());
    assert!(state.identity.is_none());
    assert_eq!(harness.store.load()?, None);

    let wrong = controller.verify_two_factor("000000").await;
    assert!(matches!(wrong, Err(SessionError::Transport(TransportError::Http { status: 400, .. }))));
    let state = controller.state();
    assert!(state.pending_two_factor.is_some());
    assert!(state.identity.is_none());
    assert!(state
        .last_error
        .as_deref()
        .is_some_and(|message| message.contains("Invalid verification code")));

    let identity = controller.verify_two_factor(" 123456 ").await?;
    assert_eq!(identity.email(), "a@b.com");
    let state = controller.state();
    assert!(state.pending_two_factor.is_none());
    assert!(state.identity.is_some());
    assert!(state.last_error.is_none());
    assert!(harness.store.load()?.is_some());
    assert_eq!(harness.transport.codes(), vec!["000000", "123456"]);
    Ok(())
}

#[tokio::test]
async fn verify_without_pending_challenge_is_a_state_error() {
    let harness = Harness::new(ScriptedTransport::new());

    let result = harness.controller.verify_two_factor("123456").await;
    assert!(matches!(result, Err(SessionError::State(_))));
    assert!(harness.controller.state().last_error.is_some());
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test]
async fn empty_code_is_rejected_before_any_request() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(challenge("challenge-1")));
    let harness = Harness::new(transport);

    harness.controller.login("a@b.com", &password()).await?;
    let result = harness.controller.verify_two_factor("   ").await;
    assert!(matches!(result, Err(SessionError::Validation(_))));
    assert!(harness.controller.state().pending_two_factor.is_some());
    assert_eq!(harness.transport.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn cancel_two_factor_drops_the_challenge() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(challenge("challenge-1")));
    let harness = Harness::new(transport);

    harness.controller.login("a@b.com", &password()).await?;
    harness.controller.cancel_two_factor();
    assert!(harness.controller.state().pending_two_factor.is_none());
    assert!(matches!(
        harness.controller.verify_two_factor("123456").await,
        Err(SessionError::State(_))
    ));
    Ok(())
}

#[tokio::test]
async fn challenge_without_token_is_a_protocol_error() {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(challenge("")));
    let harness = Harness::new(transport);

    let result = harness.controller.login("a@b.com", &password()).await;
    assert!(matches!(result, Err(SessionError::Protocol(_))));
    assert!(harness.controller.state().pending_two_factor.is_none());
}

#[tokio::test]
async fn missing_or_unreadable_token_is_a_protocol_error() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport
        .push_exchange(Ok(issued(String::new())))
        .push_exchange(Ok(issued("not-a-credential".to_string())))
        .push_exchange(Ok(issued(token(&json!({ "role": "admin" })))));
    let harness = Harness::new(transport);

    for _ in 0..3 {
        let result = harness.controller.login("a@b.com", &password()).await;
        assert!(matches!(result, Err(SessionError::Protocol(_))));
        let state = harness.controller.state();
        assert!(state.identity.is_none());
        assert!(!state.submitting);
        assert!(state.last_error.is_some());
    }
    assert_eq!(harness.store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn register_installs_identity() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(issued(live_token("new@b.com", "learner"))));
    let harness = Harness::new(transport);

    let identity = harness.controller.register("new@b.com", &password()).await?;
    assert_eq!(identity.role(), Role::Learner);
    assert!(harness.controller.is_authenticated());
    assert_eq!(harness.transport.endpoints(), vec![Endpoint::Register]);
    Ok(())
}

#[tokio::test]
async fn transport_errors_pass_through_unchanged() {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Err(rejected(401, "Bad credentials")));
    let harness = Harness::new(transport);

    let result = harness.controller.login("a@b.com", &password()).await;
    match result {
        Err(SessionError::Transport(TransportError::Http { status, message })) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(
        harness.controller.state().last_error.as_deref(),
        Some("Request failed (401): Bad credentials")
    );
}

#[tokio::test]
async fn empty_credentials_never_reach_the_transport() {
    let harness = Harness::new(ScriptedTransport::new());
    let empty = SecretString::from(String::new());

    for (email, password) in [("", password()), ("a@b.com", empty.clone()), ("  ", empty)] {
        let result = harness.controller.login(email, &password).await;
        assert!(matches!(result, Err(SessionError::Validation(_))));
        let result = harness.controller.register(email, &password).await;
        assert!(matches!(result, Err(SessionError::Validation(_))));
    }
    assert_eq!(harness.transport.calls(), 0);
    assert!(!harness.controller.state().submitting);
}

#[tokio::test]
async fn logout_twice_ends_as_guest() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_exchange(Ok(issued(live_token("a@b.com", "admin"))));
    let harness = Harness::new(transport);
    harness.controller.login("a@b.com", &password()).await?;

    harness.controller.logout();
    harness.controller.logout();

    let state = harness.controller.state();
    assert!(state.identity.is_none());
    assert!(state.pending_two_factor.is_none());
    assert_eq!(harness.controller.role(), Role::Guest);
    assert_eq!(harness.store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn logout_wins_over_in_flight_login() -> Result<()> {
    let release = Arc::new(Notify::new());
    let transport = ScriptedTransport::gated(release.clone());
    transport.push_exchange(Ok(issued(live_token("a@b.com", "admin"))));
    let harness = Harness::new(transport);

    let controller = harness.controller.clone();
    let login = tokio::spawn(async move { controller.login("a@b.com", &password()).await });

    let mut updates = harness.controller.subscribe();
    timeout(Duration::from_secs(5), updates.wait_for(|state| state.submitting)).await??;

    harness.controller.logout();
    release.notify_one();

    let result = timeout(Duration::from_secs(5), login).await??;
    assert!(matches!(result, Err(SessionError::State(_))));

    let state = harness.controller.state();
    assert!(state.identity.is_none());
    assert!(!state.submitting);
    assert_eq!(harness.store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn concurrent_login_is_rejected_while_submitting() -> Result<()> {
    let release = Arc::new(Notify::new());
    let transport = ScriptedTransport::gated(release.clone());
    transport.push_exchange(Ok(issued(live_token("a@b.com", "learner"))));
    let harness = Harness::new(transport);

    let controller = harness.controller.clone();
    let first = tokio::spawn(async move { controller.login("a@b.com", &password()).await });

    let mut updates = harness.controller.subscribe();
    timeout(Duration::from_secs(5), updates.wait_for(|state| state.submitting)).await??;

    let second = harness.controller.login("a@b.com", &password()).await;
    assert!(matches!(second, Err(SessionError::State(_))));
    assert!(harness.controller.state().submitting);

    release.notify_one();
    match timeout(Duration::from_secs(5), first).await?? {
        Ok(outcome) => assert!(!outcome.requires_two_factor()),
        Err(err) => bail!("first login should succeed: {err}"),
    }
    assert_eq!(harness.transport.calls(), 1);
    assert!(harness.controller.is_authenticated());
    Ok(())
}

#[test]
fn admin_scenario() {
    let raw = token(&json!({ "sub": "a@b.com", "role": "ADMIN", "exp": 4_000_000_000_i64 }));
    let harness = Harness::with_store(ScriptedTransport::new(), MemoryStore::with_credential(raw));
    let state = harness.controller.state();

    assert_eq!(state.role(), Role::Admin);
    assert_eq!(decide(&state, Some(&[Role::Admin]), "/admin/users"), Decision::Allow);
    assert!(matches!(
        routes::gate(&state, "/admin/courses"),
        routes::Gate::Decided(Decision::Allow)
    ));
}

#[test]
fn learner_scenario() {
    let raw = token(&json!({ "sub": "a@b.com", "role": "learner", "exp": 4_000_000_000_i64 }));
    let harness = Harness::with_store(ScriptedTransport::new(), MemoryStore::with_credential(raw));
    let state = harness.controller.state();

    assert_eq!(state.role(), Role::Learner);
    assert_eq!(
        decide(&state, Some(&[Role::Admin]), "/admin/users"),
        Decision::RedirectToHome
    );
}

#[tokio::test]
async fn new_login_replaces_pending_challenge() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport
        .push_exchange(Ok(challenge("c-1")))
        .push_exchange(Ok(challenge("c-2")))
        .push_challenge(Ok(ChallengeResponse {
            token: Some(live_token("a@b.com", "learner")),
        }));
    let harness = Harness::new(transport);
    let controller = &harness.controller;

    controller.login("a@b.com", &password()).await?;
    controller.login("a@b.com", &password()).await?;
    let pending = controller.state().pending_two_factor;
    assert_eq!(pending.as_ref().map(|token| token.expose()), Some("c-2"));

    controller.verify_two_factor("123456").await?;
    assert_eq!(harness.transport.challenge_tokens(), vec!["c-2"]);
    assert!(controller.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn logout_wins_over_in_flight_verification() -> Result<()> {
    let release = Arc::new(Notify::new());
    let transport = ScriptedTransport::gated_challenges(release.clone());
    transport
        .push_exchange(Ok(challenge("c-1")))
        .push_challenge(Ok(ChallengeResponse {
            token: Some(live_token("a@b.com", "admin")),
        }));
    let harness = Harness::new(transport);
    harness.controller.login("a@b.com", &password()).await?;

    let controller = harness.controller.clone();
    let verify = tokio::spawn(async move { controller.verify_two_factor("123456").await });

    let mut updates = harness.controller.subscribe();
    timeout(Duration::from_secs(5), updates.wait_for(|state| state.submitting)).await??;

    harness.controller.logout();
    release.notify_one();

    let result = timeout(Duration::from_secs(5), verify).await??;
    assert!(matches!(result, Err(SessionError::State(_))));

    let state = harness.controller.state();
    assert!(state.identity.is_none());
    assert!(state.pending_two_factor.is_none());
    assert!(!state.submitting);
    assert_eq!(harness.controller.role(), Role::Guest);
    assert_eq!(harness.store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn cancelled_challenge_discards_late_verification() -> Result<()> {
    let release = Arc::new(Notify::new());
    let transport = ScriptedTransport::gated_challenges(release.clone());
    transport
        .push_exchange(Ok(challenge("c-1")))
        .push_challenge(Ok(ChallengeResponse {
            token: Some(live_token("a@b.com", "learner")),
        }));
    let harness = Harness::new(transport);
    harness.controller.login("a@b.com", &password()).await?;

    let controller = harness.controller.clone();
    let verify = tokio::spawn(async move { controller.verify_two_factor("123456").await });

    let mut updates = harness.controller.subscribe();
    timeout(Duration::from_secs(5), updates.wait_for(|state| state.submitting)).await??;

    harness.controller.cancel_two_factor();
    release.notify_one();

    let result = timeout(Duration::from_secs(5), verify).await??;
    assert!(matches!(result, Err(SessionError::State(_))));

    let state = harness.controller.state();
    assert!(state.identity.is_none());
    assert!(state.pending_two_factor.is_none());
    assert_eq!(harness.store.load()?, None);
    Ok(())
}
