/// Comment model and database operations
///
/// Comments form a flat thread under a task. Deleting the task or the
/// author removes the comment.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "id, content, created_at, task_id, user_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub task_id: Uuid,

    /// Author
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (content, task_id, user_id) VALUES ($1, $2, $3) RETURNING {}",
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(data.content)
            .bind(data.task_id)
            .bind(data.user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);

        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Comments of the given tasks, oldest first
    pub async fn list_by_tasks(pool: &PgPool, task_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM comments WHERE task_id = ANY($1) ORDER BY created_at ASC",
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(task_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE comments SET content = $2 WHERE id = $1 RETURNING {}",
            COMMENT_COLUMNS
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(content)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
