/// Task templates: reusable presets a user picks from when logging work
///
/// # Schema
///
/// ```sql
/// CREATE TABLE templates (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     description TEXT NOT NULL,
///     category TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TEMPLATE_COLUMNS: &str = "id, name, description, category, created_at, user_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
}

impl Template {
    pub async fn create(pool: &PgPool, data: CreateTemplate) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (name, description, category, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            TEMPLATE_COLUMNS
        );

        sqlx::query_as::<_, Template>(&query)
            .bind(data.name)
            .bind(data.description)
            .bind(data.category)
            .bind(data.user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM templates WHERE id = $1", TEMPLATE_COLUMNS);

        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A user's templates, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM templates WHERE user_id = $1 ORDER BY created_at DESC",
            TEMPLATE_COLUMNS
        );

        sqlx::query_as::<_, Template>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
