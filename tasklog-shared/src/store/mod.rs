//! Persistence boundary
//!
//! Route handlers and domain rules talk to a [`Store`] trait object rather
//! than to a connection pool. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps everything in process and backs
//! the integration tests and database-less local runs.
//!
//! Both implementations honour the same relational rules: unique emails,
//! owner references on tasks/comments/templates, cascading deletes, and
//! audit entries that outlive their actor.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    audit_log::{AuditLog, CreateAuditLog},
    comment::{Comment, CreateComment},
    task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
    template::{CreateTemplate, Template},
    user::{CreateUser, Role, UpdateUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violated (e.g. email already registered)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced row (owner, task) does not exist
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                if constraint.contains("email") {
                    return StoreError::Conflict("Email already exists".to_string());
                }
                return StoreError::Conflict(format!("Constraint violation: {}", constraint));
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("foreign key");
                return StoreError::MissingReference(constraint.to_string());
            }
        }

        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of [`Store::create_task_unless_duplicate`]
#[derive(Debug, Clone)]
pub enum TaskInsert {
    Created(Task),

    /// A task matching the conflict filter already existed; nothing was
    /// written
    Duplicate(Task),
}

/// Everything the service persists
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Users newest first, optionally restricted to one role
    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn delete_users(&self, ids: &[Uuid]) -> StoreResult<u64>;
    async fn set_role_for_users(&self, ids: &[Uuid], role: Role) -> StoreResult<u64>;
    async fn record_login(&self, id: Uuid) -> StoreResult<bool>;

    // Tasks
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// Inserts `data` unless a task matching `conflicts` already exists
    ///
    /// The lookup and the insert are atomic: of two concurrent identical
    /// submissions, exactly one is created.
    async fn create_task_unless_duplicate(
        &self,
        data: CreateTask,
        conflicts: &TaskFilter,
    ) -> StoreResult<TaskInsert>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Sets `status` on every task with `ticket_number` except `except_id`,
    /// returning how many tasks changed
    async fn set_status_for_ticket(
        &self,
        ticket_number: &str,
        status: TaskStatus,
        except_id: Uuid,
    ) -> StoreResult<u64>;

    // Comments
    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// Comments of the given tasks, oldest first
    async fn list_comments(&self, task_ids: &[Uuid]) -> StoreResult<Vec<Comment>>;

    async fn update_comment(&self, id: Uuid, content: &str) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;

    // Templates
    async fn create_template(&self, data: CreateTemplate) -> StoreResult<Template>;
    async fn find_template(&self, id: Uuid) -> StoreResult<Option<Template>>;
    async fn list_templates(&self, user_id: Uuid) -> StoreResult<Vec<Template>>;
    async fn delete_template(&self, id: Uuid) -> StoreResult<bool>;

    // Audit log
    async fn append_audit(&self, data: CreateAuditLog) -> StoreResult<AuditLog>;
    async fn list_audit(&self, limit: i64) -> StoreResult<Vec<AuditLog>>;
}
