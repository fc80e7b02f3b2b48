/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: session token generation and validation
/// - [`session`]: session cookie handling and [`session::AuthContext`]
/// - [`middleware`]: Axum middleware that authenticates requests
/// - [`authorization`]: role gates and ownership checks
///
/// # Example
///
/// ```no_run
/// use tasklog_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tasklog_shared::auth::password::{hash_password, verify_password};
/// use tasklog_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "ana@example.com", Role::User, None);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
