/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - create a USER account
/// - `POST /api/auth/login` - verify credentials and set the session cookie
/// - `POST /api/auth/logout` - clear the session cookie
/// - `GET /api/auth/me` - profile of the session's user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasklog_shared::{
    auth::{
        jwt,
        password::{hash_password_async, verify_password_async},
        session::{clear_session_cookie, session_cookie, AuthContext},
    },
    models::user::{normalize_email, CreateUser, Role, User},
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Register / login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserInfo,
}

/// `GET /me` response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Blank names are stored as "no name"
pub(crate) fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// { "email": "ana@example.com", "password": "correct-horse", "name": "Ana" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = hash_password_async(req.password).await?;

    let user = state
        .store
        .create_user(CreateUser {
            email,
            password_hash,
            name: normalize_name(req.name),
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(AuthResponse {
        success: true,
        user: UserInfo::from(&user),
    }))
}

/// Login
///
/// Verifies the credentials, stamps `lastLogin`, and sets the `token`
/// cookie. The token is not echoed in the body.
///
/// # Errors
///
/// - `400 Bad Request`: missing email or password
/// - `401 Unauthorized`: unknown email or wrong password (same message)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_async(req.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    state.store.record_login(user.id).await?;

    let lifetime = state.config.jwt.expiration();
    let claims = jwt::Claims::for_user(&user, lifetime);
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");

    let cookie = session_cookie(&token, lifetime.num_seconds(), state.secure_cookies());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?,
    );

    let body = Json(AuthResponse {
        success: true,
        user: UserInfo::from(&user),
    });

    Ok((headers, body).into_response())
}

/// Logout: clears the session cookie
///
/// Tokens are stateless, so a copy of the token kept elsewhere stays valid
/// until it expires.
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = clear_session_cookie(state.secure_cookies());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?,
    );

    Ok((headers, Json(serde_json::json!({ "success": true }))).into_response())
}

/// Profile of the authenticated user
///
/// # Errors
///
/// - `404 Not Found`: the token is valid but the account was deleted
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        created_at: user.created_at,
        last_login: user.last_login,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(Some("  Ana ".to_string())).as_deref(), Some("Ana"));
        assert_eq!(normalize_name(Some("   ".to_string())), None);
        assert_eq!(normalize_name(None), None);
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "ana@example.com".to_string(),
            password: "long-enough".to_string(),
            name: Some("x".repeat(101)),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }
}
