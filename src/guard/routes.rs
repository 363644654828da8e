//! Dashboard route table, gate evaluation and sidebar navigation.

use super::{decide, Decision};
use crate::session::{Role, SessionState};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";

const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Roles(&'static [Role]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub title: &'static str,
    pub access: Access,
}

pub const ROUTES: &[Route] = &[
    route(LOGIN, "Sign in", Access::Public),
    route(REGISTER, "Create account", Access::Public),
    route(HOME, "Dashboard", Access::Authenticated),
    route("/profile", "My Profile", Access::Authenticated),
    route("/enrolled", "My Enrolled Courses", Access::Authenticated),
    route("/catalog", "Browse Catalog", Access::Authenticated),
    route("/admin/courses", "Course Manager", Access::Roles(ADMIN_ONLY)),
    route("/admin/users", "User Management", Access::Roles(ADMIN_ONLY)),
    route("/admin/inventory", "Course Inventory", Access::Roles(ADMIN_ONLY)),
];

const fn route(path: &'static str, title: &'static str, access: Access) -> Route {
    Route {
        path,
        title,
        access,
    }
}

/// Looks up a route, ignoring query, fragment and a trailing slash.
#[must_use]
pub fn find(path: &str) -> Option<&'static Route> {
    let path = normalize(path);
    ROUTES.iter().find(|route| route.path == path)
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    match path.trim_end_matches('/') {
        "" => HOME,
        trimmed => trimmed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Bootstrap has not resolved; show a neutral loading view.
    Waiting,
    Decided(Decision),
}

/// Evaluates the guard for `path` using the route table. Unknown paths
/// redirect home.
#[must_use]
pub fn gate(state: &SessionState, path: &str) -> Gate {
    if state.bootstrapping {
        return Gate::Waiting;
    }

    let decision = match find(path).map(|route| route.access) {
        None => Decision::RedirectToHome,
        Some(Access::Public) => Decision::Allow,
        Some(Access::Authenticated) => decide(state, None, path),
        Some(Access::Roles(roles)) => decide(state, Some(roles), path),
    };
    Gate::Decided(decision)
}

/// Where to land after a successful sign-in. Only local absolute paths are
/// honored.
#[must_use]
pub fn post_login_redirect(return_path: Option<&str>) -> &str {
    match return_path.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => HOME,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSection {
    pub title: &'static str,
    pub links: Vec<&'static Route>,
}

/// Sidebar sections visible to `role`. Empty sections are omitted.
#[must_use]
pub fn navigation(role: Role) -> Vec<NavSection> {
    let mut sections = vec![NavSection {
        title: "Common",
        links: pick(&[HOME, "/profile"]),
    }];
    match role {
        Role::Learner => sections.push(NavSection {
            title: "Learner",
            links: pick(&["/enrolled", "/catalog"]),
        }),
        Role::Admin => sections.push(NavSection {
            title: "Admin",
            links: pick(&["/admin/users", "/admin/inventory", "/admin/courses"]),
        }),
        Role::Guest => {}
    }
    sections
}

fn pick(paths: &[&str]) -> Vec<&'static Route> {
    paths.iter().filter_map(|path| find(path)).collect()
}
