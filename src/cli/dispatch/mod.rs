use crate::cli::{
    actions::Action,
    globals::{GlobalArgs, LogFormat},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;

/// Maps parsed arguments to the action to run.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let action = match matches.subcommand() {
        Some(("status", _)) => Action::Status,
        Some(("logout", _)) => Action::Logout,
        Some(("login", sub_m)) => Action::Login {
            email: required(sub_m, "email")?,
            password: SecretString::from(required(sub_m, "password")?),
            code: sub_m.get_one::<String>("code").cloned(),
        },
        Some(("register", sub_m)) => Action::Register {
            email: required(sub_m, "email")?,
            password: SecretString::from(required(sub_m, "password")?),
        },
        Some(("check", sub_m)) => Action::Check {
            path: required(sub_m, "path")?,
        },
        Some(("get", sub_m)) => Action::Get {
            path: required(sub_m, "path")?,
        },
        _ => anyhow::bail!("missing subcommand"),
    };
    Ok(action)
}

/// Collects the options shared by every subcommand.
///
/// Flags left unset are resolved later from the environment.
#[must_use]
pub fn globals(matches: &ArgMatches) -> GlobalArgs {
    GlobalArgs {
        api_base_url: matches.get_one::<String>("api-url").cloned(),
        store_dir: matches.get_one::<String>("store").map(PathBuf::from),
        timeout_secs: matches.get_one::<u64>("timeout").copied(),
        log_format: matches
            .get_one::<String>("log-format")
            .map_or(LogFormat::Text, |value| LogFormat::parse(value)),
    }
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}
