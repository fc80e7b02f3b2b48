use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreResult, TaskInsert};
use crate::db::pool::health_check;
use crate::models::{
    audit_log::{AuditLog, CreateAuditLog},
    comment::{Comment, CreateComment},
    task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
    template::{CreateTemplate, Template},
    user::{CreateUser, Role, UpdateUser, User},
};

/// Advisory lock name shared by every insert the same conflict filter
/// could collide with
fn insert_lock_key(conflicts: &TaskFilter) -> String {
    format!(
        "tasks:{}:{}",
        conflicts.user_id.map(|id| id.to_string()).unwrap_or_default(),
        conflicts.date_from.map(|d| d.timestamp()).unwrap_or_default()
    )
}

/// PostgreSQL-backed store
///
/// A thin adapter: every method delegates to the model's query functions
/// and converts `sqlx` errors into [`super::StoreError`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        Ok(User::find_by_ids(&self.pool, ids).await?)
    }

    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool, role).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn delete_users(&self, ids: &[Uuid]) -> StoreResult<u64> {
        Ok(User::delete_many(&self.pool, ids).await?)
    }

    async fn set_role_for_users(&self, ids: &[Uuid], role: Role) -> StoreResult<u64> {
        Ok(User::set_role_many(&self.pool, ids, role).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::update_last_login(&self.pool, id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn create_task_unless_duplicate(
        &self,
        data: CreateTask,
        conflicts: &TaskFilter,
    ) -> StoreResult<TaskInsert> {
        let mut tx = self.pool.begin().await?;

        // Serialises inserts for the same owner and day until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(insert_lock_key(conflicts))
            .execute(&mut *tx)
            .await?;

        if let Some(existing) = Task::list(&mut *tx, conflicts).await?.pop() {
            tx.rollback().await?;
            return Ok(TaskInsert::Duplicate(existing));
        }

        let task = Task::create(&mut *tx, data).await?;
        tx.commit().await?;
        Ok(TaskInsert::Created(task))
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, filter).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, data).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn set_status_for_ticket(
        &self,
        ticket_number: &str,
        status: TaskStatus,
        except_id: Uuid,
    ) -> StoreResult<u64> {
        Ok(Task::set_status_for_ticket(&self.pool, ticket_number, status, except_id).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(Comment::find_by_id(&self.pool, id).await?)
    }

    async fn list_comments(&self, task_ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_tasks(&self.pool, task_ids).await?)
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> StoreResult<Option<Comment>> {
        Ok(Comment::update_content(&self.pool, id, content).await?)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Comment::delete(&self.pool, id).await?)
    }

    async fn create_template(&self, data: CreateTemplate) -> StoreResult<Template> {
        Ok(Template::create(&self.pool, data).await?)
    }

    async fn find_template(&self, id: Uuid) -> StoreResult<Option<Template>> {
        Ok(Template::find_by_id(&self.pool, id).await?)
    }

    async fn list_templates(&self, user_id: Uuid) -> StoreResult<Vec<Template>> {
        Ok(Template::list_by_user(&self.pool, user_id).await?)
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Template::delete(&self.pool, id).await?)
    }

    async fn append_audit(&self, data: CreateAuditLog) -> StoreResult<AuditLog> {
        Ok(AuditLog::create(&self.pool, data).await?)
    }

    async fn list_audit(&self, limit: i64) -> StoreResult<Vec<AuditLog>> {
        Ok(AuditLog::list_recent(&self.pool, limit).await?)
    }
}
