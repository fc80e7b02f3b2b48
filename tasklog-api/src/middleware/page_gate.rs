/// Page gate: redirects browser navigation based on the session
///
/// API routes, `/health` and static assets pass straight through; they
/// enforce their own authentication. For page paths the session token is
/// validated and its role claim decides where the browser belongs:
///
/// | Path                          | No session      | USER         | ADMIN     |
/// |-------------------------------|-----------------|--------------|-----------|
/// | `/admin/login`                | pass            | pass         | `/admin`  |
/// | other `/admin*`               | `/admin/login`  | `/dashboard` | pass      |
/// | `/`, `/login`, `/register`    | pass            | `/dashboard` | `/admin`  |
/// | `/dashboard*`                 | `/login`        | pass         | pass      |
///
/// An expired or forged token counts as no session.

use crate::app::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tasklog_shared::{auth::session::authenticate, models::user::Role};

/// Prefixes that are never gated
const PASS_THROUGH: [&str; 4] = ["/api/", "/health", "/_next", "/static"];

/// Pages that only make sense without a session
const PUBLIC_PAGES: [&str; 3] = ["/", "/login", "/register"];

const ADMIN_LOGIN: &str = "/admin/login";

/// `path` equals `prefix` or continues it with a new segment
fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

/// Where a request for `path` should be sent, or `None` to let it through
///
/// `role` is the role of a valid session, if there is one.
pub fn gate_decision(path: &str, role: Option<Role>) -> Option<&'static str> {
    if PASS_THROUGH.iter().any(|prefix| path.starts_with(prefix)) {
        return None;
    }

    if path == ADMIN_LOGIN {
        return match role {
            Some(Role::Admin) => Some("/admin"),
            _ => None,
        };
    }

    if under(path, "/admin") {
        return match role {
            None => Some(ADMIN_LOGIN),
            Some(Role::User) => Some("/dashboard"),
            Some(Role::Admin) => None,
        };
    }

    if PUBLIC_PAGES.contains(&path) {
        return match role {
            None => None,
            Some(Role::User) => Some("/dashboard"),
            Some(Role::Admin) => Some("/admin"),
        };
    }

    if under(path, "/dashboard") && role.is_none() {
        return Some("/login");
    }

    None
}

/// Axum middleware applying [`gate_decision`]
pub async fn page_gate_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();

    if PASS_THROUGH.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(req).await;
    }

    let role = authenticate(req.headers(), state.jwt_secret())
        .and_then(Result::ok)
        .map(|claims| claims.role);

    match gate_decision(&path, role) {
        Some(target) => {
            tracing::debug!(path = %path, target, "Page gate redirect");
            Redirect::temporary(target).into_response()
        }
        None => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_and_assets_pass_through() {
        for path in ["/api/tasks", "/api/admin/users", "/health", "/_next/app.js", "/static/logo.png"] {
            assert_eq!(gate_decision(path, None), None, "{}", path);
        }
    }

    #[test]
    fn test_admin_pages() {
        assert_eq!(gate_decision("/admin", None), Some("/admin/login"));
        assert_eq!(gate_decision("/admin/users", None), Some("/admin/login"));
        assert_eq!(gate_decision("/admin/users", Some(Role::User)), Some("/dashboard"));
        assert_eq!(gate_decision("/admin/users", Some(Role::Admin)), None);
    }

    #[test]
    fn test_admin_login_page() {
        assert_eq!(gate_decision("/admin/login", None), None);
        assert_eq!(gate_decision("/admin/login", Some(Role::User)), None);
        assert_eq!(gate_decision("/admin/login", Some(Role::Admin)), Some("/admin"));
    }

    #[test]
    fn test_public_pages_redirect_signed_in_users() {
        assert_eq!(gate_decision("/login", None), None);
        assert_eq!(gate_decision("/", Some(Role::User)), Some("/dashboard"));
        assert_eq!(gate_decision("/register", Some(Role::Admin)), Some("/admin"));
    }

    #[test]
    fn test_dashboard_requires_session() {
        assert_eq!(gate_decision("/dashboard", None), Some("/login"));
        assert_eq!(gate_decision("/dashboard/analytics", None), Some("/login"));
        assert_eq!(gate_decision("/dashboard", Some(Role::User)), None);
    }

    #[test]
    fn test_prefix_is_segment_aware() {
        assert_eq!(gate_decision("/administrator", None), None);
        assert_eq!(gate_decision("/dashboards", None), None);
    }
}
