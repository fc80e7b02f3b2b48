/// Startup provisioning of the administrator account
///
/// Registration only ever creates `USER` accounts, so a fresh deployment
/// needs one administrator from outside the API. When configured, the
/// account is created, or an existing account with that email is promoted
/// to `ADMIN` and its password reset.

use crate::config::AdminBootstrap;
use tasklog_shared::{
    auth::password::{hash_password_async, PasswordError, MIN_PASSWORD_LENGTH},
    models::user::{normalize_email, CreateUser, Role, UpdateUser, User},
    store::{Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Admin password must be at least {0} characters")]
    WeakPassword(usize),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Admin account vanished while being promoted")]
    Vanished,
}

/// Makes sure `admin` exists with the ADMIN role and the given password
pub async fn ensure_admin(store: &dyn Store, admin: &AdminBootstrap) -> Result<User, BootstrapError> {
    if admin.password.len() < MIN_PASSWORD_LENGTH {
        return Err(BootstrapError::WeakPassword(MIN_PASSWORD_LENGTH));
    }

    let email = normalize_email(&admin.email);
    let password_hash = hash_password_async(admin.password.clone()).await?;

    match store.find_user_by_email(&email).await? {
        Some(existing) => {
            let user = store
                .update_user(
                    existing.id,
                    UpdateUser {
                        password_hash: Some(password_hash),
                        role: Some(Role::Admin),
                        ..Default::default()
                    },
                )
                .await?
                .ok_or(BootstrapError::Vanished)?;

            tracing::info!(user_id = %user.id, "Existing account promoted to admin");
            Ok(user)
        }
        None => {
            let user = store
                .create_user(CreateUser {
                    email,
                    password_hash,
                    name: admin.name.clone(),
                    role: Role::Admin,
                })
                .await?;

            tracing::info!(user_id = %user.id, "Admin account created");
            Ok(user)
        }
    }
}
