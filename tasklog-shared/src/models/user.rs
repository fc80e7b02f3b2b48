/// User model and database operations
///
/// Users log tasks, write comments and own templates. The `role` column
/// decides which API surface a user may reach: `USER` accounts log work,
/// `ADMIN` accounts manage users and read aggregate statistics.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('USER', 'ADMIN');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL,
///     name TEXT,
///     password_hash TEXT NOT NULL,
///     role user_role NOT NULL DEFAULT 'USER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklog_shared::models::user::{CreateUser, Role, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "ana@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Ana".to_string()),
///     role: Role::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ANA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, last_login";

/// Account role carried in the session token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular account that logs its own work
    #[default]
    User,

    /// Administrator: user management, audit log, statistics
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User account
///
/// The password hash never leaves the server: it is skipped when the
/// struct is serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Email address, unique regardless of case
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: Role,

    pub created_at: DateTime<Utc>,

    /// Stamped on every successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown in reports: the display name, or the email when unset
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }

    /// Compact owner/author summary embedded in task and comment payloads
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Name and email of a task owner, comment author or audit actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: Option<String>,
    pub email: String,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,

    pub name: Option<String>,

    pub role: Role,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,

    pub password_hash: Option<String>,

    /// `Some(None)` clears the name
    pub name: Option<Option<String>>,

    pub role: Option<Role>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.name.is_none()
            && self.role.is_none()
    }
}

/// Canonical form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the email is already registered.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Loads several users at once; missing ids are skipped
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Lists users newest first, optionally restricted to one role
    pub async fn list(pool: &PgPool, role: Option<Role>) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE ($1::user_role IS NULL OR role = $1) \
             ORDER BY created_at DESC",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` when the user does not exist. An empty update is a
    /// plain lookup.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        // Build dynamic update query based on which fields are present
        let mut sets: Vec<String> = Vec::new();
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            sets.push(format!("email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            sets.push(format!("password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            sets.push(format!("name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            sets.push(format!("role = ${}", bind_count));
        }

        let query = format!(
            "UPDATE users SET {} WHERE id = $1 RETURNING {}",
            sets.join(", "),
            USER_COLUMNS
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user; tasks, comments and templates cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every listed user, returning how many rows went away
    pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Sets the role of every listed user
    pub async fn set_role_many(pool: &PgPool, ids: &[Uuid], role: Role) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(role)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Stamps the last login time, called after a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
