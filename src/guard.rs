use crate::auth::SessionManager;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const ADMIN_PREFIX: &str = "/admin";

/// GuardDecision
///
/// Outcome of checking a view against the current session. Denial is a
/// redirect target, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

impl GuardDecision {
    pub fn is_allowed(self) -> bool {
        self == GuardDecision::Allow
    }
}

/// requires_admin
///
/// True for `/admin` and anything below it (`/admin/events`,
/// `/admin/broadcast`). Query strings and fragments are ignored, and a
/// path that merely starts with the same letters (`/administration`) is
/// public.
pub fn requires_admin(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Admin gate. Anonymous users are sent to the login page, signed-in
/// non-admins to the home page.
///
/// This only hides views. The backend validates the bearer token and role on
/// every request regardless of what the guard decided.
pub fn check_admin(session: &SessionManager) -> GuardDecision {
    if session.is_admin() {
        GuardDecision::Allow
    } else if session.is_authenticated() {
        GuardDecision::Redirect(HOME_PATH)
    } else {
        GuardDecision::Redirect(LOGIN_PATH)
    }
}

/// check_path
///
/// Decides whether the view at `path` may be shown right now. Public paths
/// are always allowed; admin paths defer to `check_admin`. The decision
/// reads the session as it is at call time, so it follows login and logout
/// without any caching.
pub fn check_path(path: &str, session: &SessionManager) -> GuardDecision {
    if !requires_admin(path) {
        return GuardDecision::Allow;
    }
    let decision = check_admin(session);
    if let GuardDecision::Redirect(to) = decision {
        tracing::debug!(%path, redirect = to, "admin view denied");
    }
    decision
}
