//! Runs a CLI action against a freshly bootstrapped session.

use crate::{
    cli::{actions::Action, globals::GlobalArgs},
    guard::{
        routes::{self, Gate},
        Decision,
    },
    session::{FileStore, Identity, LoginOutcome, Session, SessionController, SessionError, SessionState},
    transport::HttpTransport,
};
use anyhow::{Context, Result};
use std::{
    fmt::{self, Write as _},
    sync::Arc,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Prompted codes get a few tries; the challenge stays pending between them.
const MAX_CODE_ATTEMPTS: usize = 3;

struct Client {
    controller: SessionController,
    transport: Arc<HttpTransport>,
}

impl Client {
    fn connect(globals: &GlobalArgs) -> Result<Self> {
        let config = globals.client_config()?;
        debug!(api = %config.api_base_url, store = %config.storage_dir.display(), "client configured");

        let session = Session::new(Arc::new(FileStore::in_dir(&config.storage_dir)));
        let transport = Arc::new(HttpTransport::new(
            &config,
            Arc::new(session.clone()),
            Arc::new(session.clone()),
        )?);
        let controller = SessionController::new(session, transport.clone());
        controller.bootstrap();

        Ok(Self {
            controller,
            transport,
        })
    }
}

/// Handle the action
///
/// # Errors
/// Returns an error if the configuration is invalid or the operation fails.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let client = Client::connect(globals)?;
    let controller = &client.controller;

    let report = match action {
        Action::Status => render_status(&controller.state())?,
        Action::Login {
            email,
            password,
            code,
        } => match controller.login(&email, &password).await? {
            LoginOutcome::Authenticated(identity) => signed_in(&identity),
            LoginOutcome::ChallengeRequired(_) => {
                let identity = match code {
                    Some(code) => controller.verify_two_factor(&code).await?,
                    None => verify_interactively(controller).await?,
                };
                signed_in(&identity)
            }
        },
        Action::Register { email, password } => {
            signed_in(&controller.register(&email, &password).await?)
        }
        Action::Logout => {
            controller.logout();
            "Signed out.".to_string()
        }
        Action::Check { path } => describe_gate(&routes::gate(&controller.state(), &path), &path),
        Action::Get { path } => {
            if !controller.is_authenticated() {
                warn!("no stored session; sending the request without credentials");
            }
            let body = client.transport.get_json::<serde_json::Value>(&path).await?;
            serde_json::to_string_pretty(&body)?
        }
    };

    println!("{report}");
    Ok(())
}

async fn verify_interactively(controller: &SessionController) -> Result<Identity> {
    let mut attempt = 1;
    loop {
        let code = prompt("Verification code: ").await?;
        match controller.verify_two_factor(&code).await {
            Ok(identity) => return Ok(identity),
            Err(err @ (SessionError::Validation(_) | SessionError::Transport(_)))
                if attempt < MAX_CODE_ATTEMPTS =>
            {
                eprintln!("{err}");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn prompt(label: &str) -> Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(label.as_bytes()).await?;
    stderr.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read verification code")?;
    Ok(line.trim().to_string())
}

fn signed_in(identity: &Identity) -> String {
    format!("Signed in as {} ({}).", identity.email(), identity.role())
}

/// Human readable summary of the session and the views it unlocks.
///
/// # Errors
/// Returns an error if formatting fails.
pub fn render_status(state: &SessionState) -> Result<String, fmt::Error> {
    let Some(identity) = state.identity.as_ref() else {
        return Ok("Not signed in.".to_string());
    };

    let mut out = String::new();
    writeln!(
        out,
        "Signed in as {} <{}> ({})",
        state.display_name(),
        identity.email(),
        identity.role()
    )?;
    if let Some(expires_at) = identity.expires_at() {
        writeln!(out, "Expires: {}", expires_at.to_rfc3339())?;
    }
    for section in routes::navigation(identity.role()) {
        writeln!(out, "{}:", section.title)?;
        for link in section.links {
            writeln!(out, "  {:<20} {}", link.title, link.path)?;
        }
    }
    Ok(out.trim_end().to_string())
}

/// One-line description of a guard result for `path`.
#[must_use]
pub fn describe_gate(gate: &Gate, path: &str) -> String {
    match gate {
        Gate::Waiting => "waiting: session is still loading".to_string(),
        Gate::Decided(Decision::Allow) => format!("allow: {path}"),
        Gate::Decided(Decision::RedirectToLogin { return_path }) => format!(
            "redirect: {} (after sign-in: {})",
            routes::LOGIN,
            routes::post_login_redirect(Some(return_path.as_str()))
        ),
        Gate::Decided(Decision::RedirectToHome) => format!("redirect: {}", routes::HOME),
    }
}
