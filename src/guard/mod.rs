//! Route guard for role-gated dashboard views.
//!
//! UX-only: it decides what the client shows, real access control lives on
//! the API. The decision is a pure function of its inputs; callers must not
//! ask for one while the session is still bootstrapping (see
//! [`routes::gate`], which handles that case).

pub mod routes;

use crate::session::{Role, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Not signed in; `return_path` is where to go back after login.
    RedirectToLogin { return_path: String },
    /// Signed in without a required role.
    RedirectToHome,
}

/// Decides access to `current_path` for `state`.
///
/// `required_roles` of `None` means any signed-in role is enough.
#[must_use]
pub fn decide(state: &SessionState, required_roles: Option<&[Role]>, current_path: &str) -> Decision {
    if !state.is_authenticated() {
        return Decision::RedirectToLogin {
            return_path: current_path.to_string(),
        };
    }

    match required_roles {
        Some(roles) if !roles.contains(&state.role()) => Decision::RedirectToHome,
        _ => Decision::Allow,
    }
}
