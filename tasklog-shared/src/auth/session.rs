/// Session cookie handling and the authenticated principal
///
/// Browsers carry the session token in an httpOnly `token` cookie. API
/// clients may send the same token as `Authorization: Bearer <token>`. The
/// cookie is tried first, but a stale cookie never shadows a valid Bearer
/// token.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use tasklog_shared::auth::session::{session_cookie, session_tokens};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
/// assert_eq!(session_tokens(&headers), vec!["abc".to_string()]);
///
/// let set_cookie = session_cookie("abc", 3600, false);
/// assert!(set_cookie.contains("HttpOnly"));
/// ```

use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};
use crate::models::user::Role;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Session tokens carried by a request: the `token` cookie, then a Bearer
/// authorization header
///
/// Empty values count as absent.
pub fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    [cookie_token(headers), bearer_token(headers)]
        .into_iter()
        .flatten()
        .collect()
}

/// Validates the session a request carries
///
/// Returns `None` when there is no token at all. Otherwise returns the
/// claims of the first token that validates, or the error of the last
/// token tried.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Option<Result<Claims, JwtError>> {
    let mut outcome = None;
    for token in session_tokens(headers) {
        match validate_token(&token, secret) {
            Ok(claims) => return Some(Ok(claims)),
            Err(err) => outcome = Some(Err(err)),
        }
    }
    outcome
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// `Set-Cookie` value carrying a freshly issued token
///
/// `max_age_secs` should match the token's lifetime so the browser drops
/// the cookie when the token stops validating.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = base_cookie(token.to_string(), secure);
    cookie.set_max_age(cookie::time::Duration::seconds(max_age_secs));
    cookie.to_string()
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = base_cookie(String::new(), secure);
    cookie.make_removal();
    cookie.to_string()
}

/// Authenticated principal, inserted into request extensions by the
/// session middleware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            name: claims.name,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
