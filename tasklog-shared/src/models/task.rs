/// Task model and database operations
///
/// A task is one logged work item: what was done, in which category, for
/// which ticket, and how far it got. Tasks in the [`TICKET_CATEGORY`]
/// carrying a ticket number are kept status-consistent across users (see
/// [`crate::ticket`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('PENDING', 'IN_PROGRESS', 'COMPLETED');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     description TEXT NOT NULL,
///     category TEXT NOT NULL,
///     ticket_number TEXT,
///     status task_status NOT NULL DEFAULT 'PENDING',
///     date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Category whose ticket numbers are synchronised across users
pub const TICKET_CATEGORY: &str = "Axios";

/// Category used when a task is logged without one
pub const DEFAULT_CATEGORY: &str = "Other Task";

/// Categories offered to users, in display order
pub const KNOWN_CATEGORIES: [&str; 5] = ["Axios", "Whatsapp", "Other Task", "Releases", "Monitoring"];

const TASK_COLUMNS: &str = "id, description, category, ticket_number, status, date, created_at, user_id";

/// Progress of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

/// Logged work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub ticket_number: Option<String>,
    pub status: TaskStatus,

    /// Day the work was done; defaults to the creation time
    pub date: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    /// Owning user
    pub user_id: Uuid,
}

impl Task {
    /// Whether a status change on this task must be pushed to the other
    /// tasks sharing its ticket number
    pub fn syncs_ticket(&self) -> bool {
        self.category == TICKET_CATEGORY && self.ticket_number.is_some()
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub description: String,
    pub category: String,
    pub ticket_number: Option<String>,
    pub status: TaskStatus,
    pub date: DateTime<Utc>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub description: Option<String>,
    pub category: Option<String>,

    /// `Some(None)` clears the ticket number
    pub ticket_number: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub date: Option<DateTime<Utc>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category.is_none()
            && self.ticket_number.is_none()
            && self.status.is_none()
            && self.date.is_none()
    }

    /// The task as it will look once this update is applied
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(category) = &self.category {
            next.category = category.clone();
        }
        if let Some(ticket_number) = &self.ticket_number {
            next.ticket_number = ticket_number.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(date) = self.date {
            next.date = date;
        }
        next
    }
}

/// Sort order for task listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskOrder {
    /// Most recently logged first
    #[default]
    CreatedDesc,

    /// Most recent work day first
    DateDesc,
}

/// Conjunctive task filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub user_id: Option<Uuid>,
    pub category: Option<String>,
    pub status: Option<TaskStatus>,
    pub ticket_number: Option<String>,

    /// Compared with surrounding whitespace ignored on both sides
    pub description: Option<String>,

    /// Inclusive lower bound on `date`
    pub date_from: Option<DateTime<Utc>>,

    /// Exclusive upper bound on `date`
    pub date_until: Option<DateTime<Utc>>,

    pub exclude_id: Option<Uuid>,
    pub order: TaskOrder,
    pub limit: Option<i64>,
}

impl TaskFilter {
    /// In-memory evaluation, kept in step with the SQL in [`Task::list`]
    pub fn matches(&self, task: &Task) -> bool {
        self.user_id.map_or(true, |id| task.user_id == id)
            && self.category.as_ref().map_or(true, |c| &task.category == c)
            && self.status.map_or(true, |s| task.status == s)
            && self
                .ticket_number
                .as_ref()
                .map_or(true, |t| task.ticket_number.as_ref() == Some(t))
            && self
                .description
                .as_ref()
                .map_or(true, |d| task.description.trim() == d.trim())
            && self.date_from.map_or(true, |from| task.date >= from)
            && self.date_until.map_or(true, |until| task.date < until)
            && self.exclude_id.map_or(true, |id| task.id != id)
    }
}

/// Trims a ticket number; blank input means "no ticket"
pub fn normalize_ticket(ticket: Option<&str>) -> Option<String> {
    ticket
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl Task {
    /// Inserts a task
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the owner does not exist.
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tasks (description, category, ticket_number, status, date, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.description)
            .bind(data.category)
            .bind(data.ticket_number)
            .bind(data.status)
            .bind(data.date)
            .bind(data.user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tasks matching a filter
    pub async fn list<'e, E>(executor: E, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tasks WHERE TRUE", TASK_COLUMNS));

        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(ticket_number) = &filter.ticket_number {
            qb.push(" AND ticket_number = ").push_bind(ticket_number.clone());
        }
        if let Some(description) = &filter.description {
            qb.push(" AND btrim(description) = ").push_bind(description.trim().to_string());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(until) = filter.date_until {
            qb.push(" AND date < ").push_bind(until);
        }
        if let Some(exclude_id) = filter.exclude_id {
            qb.push(" AND id <> ").push_bind(exclude_id);
        }

        qb.push(match filter.order {
            TaskOrder::CreatedDesc => " ORDER BY created_at DESC",
            TaskOrder::DateDesc => " ORDER BY date DESC, created_at DESC",
        });

        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        qb.build_query_as::<Task>().fetch_all(executor).await
    }

    /// Applies a partial update, returning `None` when the task is gone
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE tasks SET ");
        let mut sets = qb.separated(", ");

        if let Some(description) = data.description {
            sets.push("description = ").push_bind_unseparated(description);
        }
        if let Some(category) = data.category {
            sets.push("category = ").push_bind_unseparated(category);
        }
        if let Some(ticket_number) = data.ticket_number {
            sets.push("ticket_number = ").push_bind_unseparated(ticket_number);
        }
        if let Some(status) = data.status {
            sets.push("status = ").push_bind_unseparated(status);
        }
        if let Some(date) = data.date {
            sets.push("date = ").push_bind_unseparated(date);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {}", TASK_COLUMNS));

        qb.build_query_as::<Task>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets `status` on every other task carrying `ticket_number`
    ///
    /// Rows already in that status are not touched, so the count is the
    /// number of tasks that actually changed.
    pub async fn set_status_for_ticket(
        pool: &PgPool,
        ticket_number: &str,
        status: TaskStatus,
        except_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2
            WHERE ticket_number = $1
              AND id <> $3
              AND status <> $2
            "#,
        )
        .bind(ticket_number)
        .bind(status)
        .bind(except_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
