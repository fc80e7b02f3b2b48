/// Append-only audit trail of administrative batch actions
///
/// Rows are never updated. When the acting admin is deleted the entry
/// stays with `user_id` cleared.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     action TEXT NOT NULL,
///     details TEXT NOT NULL,
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::user::Role;

/// Recorded administrative action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    BatchDelete,
    BatchRoleChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BatchDelete => "BATCH_DELETE",
            AuditAction::BatchRoleChange => "BATCH_ROLE_CHANGE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub action: String,
    pub details: String,

    /// Acting admin; `None` once that account is deleted
    pub user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLog {
    pub user_id: Uuid,
    pub action: String,
    pub details: String,
}

impl CreateAuditLog {
    /// Entry for a batch delete of `count` users
    pub fn batch_delete(actor: Uuid, count: usize) -> Self {
        Self {
            user_id: actor,
            action: AuditAction::BatchDelete.to_string(),
            details: format!("Deleted {} users", count),
        }
    }

    /// Entry for a batch role change of `count` users
    pub fn batch_role_change(actor: Uuid, role: Role, count: usize) -> Self {
        Self {
            user_id: actor,
            action: AuditAction::BatchRoleChange.to_string(),
            details: format!("Changed role to {} for {} users", role, count),
        }
    }
}

impl AuditLog {
    pub async fn create(pool: &PgPool, data: CreateAuditLog) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (action, details, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, action, details, user_id, created_at
            "#,
        )
        .bind(data.action)
        .bind(data.details)
        .bind(data.user_id)
        .fetch_one(pool)
        .await
    }

    /// Most recent entries first
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, action, details, user_id, created_at
            FROM audit_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
