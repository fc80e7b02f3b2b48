/// Session token generation and validation
///
/// Session tokens are JWTs signed with HS256 (HMAC-SHA256). They carry the
/// user's identity and role so that role gates and the page redirect gate
/// can decide without a database round trip.
///
/// # Security
///
/// - **Algorithm**: HS256
/// - **Expiration**: configurable, 24 hours by default
/// - **Validation**: signature, expiration, not-before and issuer
/// - **Secret Management**: secrets should be at least 32 bytes
///
/// Tokens are stateless: there is no refresh token, no rotation and no
/// revocation list. Logging out only clears the cookie.
///
/// # Example
///
/// ```
/// use tasklog_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tasklog_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(Uuid::new_v4(), "ana@example.com", Role::User, None);
/// let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
///
/// let validated = validate_token(&token, "your-secret-key-at-least-32-bytes")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Issuer stamped into and required from every token
pub const ISSUER: &str = "tasklog";

/// Default session lifetime in hours
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: user ID
/// - `iss`: always "tasklog"
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Custom Claims
///
/// - `email`, `name`: shown by pages without a profile lookup
/// - `role`: consulted by role gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    /// Creates claims with the default 24 hour lifetime
    pub fn new(user_id: Uuid, email: &str, role: Role, name: Option<String>) -> Self {
        Self::with_expiration(
            user_id,
            email,
            role,
            name,
            Duration::hours(DEFAULT_EXPIRATION_HOURS),
        )
    }

    /// Creates claims with a custom lifetime
    pub fn with_expiration(
        user_id: Uuid,
        email: &str,
        role: Role,
        name: Option<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        // Out-of-range lifetimes saturate instead of overflowing
        let expiration = now
            .checked_add_signed(expires_in)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            name,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Claims describing `user`, valid for `expires_in`
    pub fn for_user(user: &User, expires_in: Duration) -> Self {
        Self::with_expiration(user.id, &user.email, user.role, user.name.clone(), expires_in)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs `claims` with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, expiry, not-before time and issuer. No leeway is
/// granted on expiry.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
