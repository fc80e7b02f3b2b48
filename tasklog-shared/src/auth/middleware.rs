/// Session authentication middleware for Axum
///
/// Reads the session token (cookie or Bearer header), validates it and adds
/// an [`AuthContext`] to the request extensions. Requests without a valid
/// token are rejected with 401 before reaching the handler.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use tasklog_shared::auth::middleware::create_session_middleware;
/// use tasklog_shared::auth::session::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.email)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn(create_session_middleware("secret".to_string())));
/// ```

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::jwt::JwtError;
use super::session::{authenticate, AuthContext};

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No session cookie and no Bearer header
    MissingCredentials,

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::MissingCredentials => "Unauthorized".to_string(),
            AuthError::InvalidToken(msg) => msg.clone(),
        };

        let body = json!({
            "error": "unauthorized",
            "message": message,
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Session authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if the token is missing, malformed, expired,
/// or signed with another secret.
pub async fn session_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = authenticate(req.headers(), &secret)
        .ok_or(AuthError::MissingCredentials)?
        .map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        })?;

    tracing::trace!(user_id = %claims.sub, role = %claims.role, "Session authenticated");

    req.extensions_mut().insert(AuthContext::from_claims(claims));

    Ok(next.run(req).await)
}

/// Creates a session authentication middleware closure
///
/// Captures the JWT secret for use with `axum::middleware::from_fn`.
pub fn create_session_middleware(
    secret: String,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let secret = secret.clone();
        Box::pin(session_auth_middleware(secret, req, next))
    }
}
