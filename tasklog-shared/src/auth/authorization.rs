/// Authorization helpers and permission checks
///
/// # Permission Model
///
/// 1. **Role gate**: an endpoint names the role it serves; the caller's
///    role claim must equal it. Roles are not ordered, so an ADMIN does not
///    pass a USER gate.
/// 2. **Ownership**: a resource may be mutated by its owner or by any ADMIN.
///
/// # Example
///
/// ```
/// use tasklog_shared::auth::authorization::{require_owner_or_admin, require_role};
/// use tasklog_shared::auth::session::AuthContext;
/// use tasklog_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     email: "ana@example.com".to_string(),
///     role: Role::User,
///     name: None,
/// };
///
/// assert!(require_role(&auth, Role::User).is_ok());
/// assert!(require_role(&auth, Role::Admin).is_err());
/// assert!(require_owner_or_admin(&auth, auth.user_id).is_ok());
/// ```

use uuid::Uuid;

use super::session::AuthContext;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role does not match the endpoint's role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// Caller neither owns the resource nor is an admin
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Passes only when the caller's role equals `required`
pub fn require_role(auth: &AuthContext, required: Role) -> Result<(), AuthzError> {
    if auth.role != required {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Passes when the caller owns the resource or is an admin
pub fn require_owner_or_admin(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == owner_id || auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Passes when the caller is one of `owner_ids` or is an admin
///
/// Used where more than one party holds rights over a resource, e.g. a
/// comment that both its author and the task owner may delete.
pub fn require_any_owner_or_admin(
    auth: &AuthContext,
    owner_ids: &[Uuid],
) -> Result<(), AuthzError> {
    if auth.is_admin() || owner_ids.contains(&auth.user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
            name: None,
        }
    }

    #[test]
    fn test_require_role_is_exact() {
        let user = context(Role::User);
        let admin = context(Role::Admin);

        assert!(require_role(&user, Role::User).is_ok());
        assert!(require_role(&admin, Role::Admin).is_ok());

        assert_eq!(
            require_role(&admin, Role::User),
            Err(AuthzError::InsufficientRole {
                required: Role::User,
                actual: Role::Admin,
            })
        );
        assert!(require_role(&user, Role::Admin).is_err());
    }

    #[test]
    fn test_require_owner_or_admin() {
        let owner = context(Role::User);
        let stranger = context(Role::User);
        let admin = context(Role::Admin);

        assert!(require_owner_or_admin(&owner, owner.user_id).is_ok());
        assert!(require_owner_or_admin(&admin, owner.user_id).is_ok());
        assert_eq!(
            require_owner_or_admin(&stranger, owner.user_id),
            Err(AuthzError::NotAuthorized)
        );
    }

    #[test]
    fn test_require_any_owner_or_admin() {
        let author = context(Role::User);
        let task_owner = context(Role::User);
        let stranger = context(Role::User);
        let admin = context(Role::Admin);
        let owners = [author.user_id, task_owner.user_id];

        assert!(require_any_owner_or_admin(&author, &owners).is_ok());
        assert!(require_any_owner_or_admin(&task_owner, &owners).is_ok());
        assert!(require_any_owner_or_admin(&admin, &owners).is_ok());
        assert!(require_any_owner_or_admin(&stranger, &owners).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = AuthzError::InsufficientRole {
            required: Role::Admin,
            actual: Role::User,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient permissions: requires ADMIN, has USER"
        );
    }
}
