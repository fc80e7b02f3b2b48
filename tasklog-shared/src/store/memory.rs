use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, TaskInsert};
use crate::models::{
    audit_log::{AuditLog, CreateAuditLog},
    comment::{Comment, CreateComment},
    task::{CreateTask, Task, TaskFilter, TaskOrder, TaskStatus, UpdateTask},
    template::{CreateTemplate, Template},
    user::{CreateUser, Role, UpdateUser, User},
};

/// Rows kept in insertion order; listings sort a reversed copy with a
/// stable sort so equal timestamps come back newest-inserted first.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    comments: Vec<Comment>,
    templates: Vec<Template>,
    audit: Vec<AuditLog>,
}

impl Tables {
    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email.trim()))
    }

    fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        if !self.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("tasks_user_id_fkey".to_string()));
        }

        let task = Task {
            id: Uuid::new_v4(),
            description: data.description,
            category: data.category,
            ticket_number: data.ticket_number,
            status: data.status,
            date: data.date,
            created_at: Utc::now(),
            user_id: data.user_id,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Removes users and everything that cascades from them
    fn remove_users(&mut self, ids: &HashSet<Uuid>) -> u64 {
        let before = self.users.len();
        self.users.retain(|u| !ids.contains(&u.id));
        let removed = (before - self.users.len()) as u64;

        let doomed_tasks: HashSet<Uuid> = self
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.user_id))
            .map(|t| t.id)
            .collect();
        self.tasks.retain(|t| !doomed_tasks.contains(&t.id));
        self.comments
            .retain(|c| !ids.contains(&c.user_id) && !doomed_tasks.contains(&c.task_id));
        self.templates.retain(|t| !ids.contains(&t.user_id));

        for entry in self.audit.iter_mut() {
            if entry.user_id.map_or(false, |id| ids.contains(&id)) {
                entry.user_id = None;
            }
        }

        removed
    }
}

/// In-process store with the same relational rules as [`super::PgStore`]
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_conflict() -> StoreError {
    StoreError::Conflict("Email already exists".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&data.email, None) {
            return Err(email_conflict());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            role: data.role,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .rev()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &data.email {
            if tables.email_taken(email, Some(id)) {
                return Err(email_conflict());
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(role) = data.role {
            user.role = role;
        }

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_users(&HashSet::from([id])) > 0)
    }

    async fn delete_users(&self, ids: &[Uuid]) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_users(&ids.iter().copied().collect()))
    }

    async fn set_role_for_users(&self, ids: &[Uuid], role: Role) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for user in tables.users.iter_mut().filter(|u| ids.contains(&u.id)) {
            user.role = role;
            changed += 1;
        }
        Ok(changed)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.last_login = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        self.tables.write().await.insert_task(data)
    }

    async fn create_task_unless_duplicate(
        &self,
        data: CreateTask,
        conflicts: &TaskFilter,
    ) -> StoreResult<TaskInsert> {
        // One write guard covers both the lookup and the insert
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.tasks.iter().find(|t| conflicts.matches(t)) {
            return Ok(TaskInsert::Duplicate(existing.clone()));
        }
        tables.insert_task(data).map(TaskInsert::Created)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        match filter.order {
            TaskOrder::CreatedDesc => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            TaskOrder::DateDesc => tasks.sort_by(|a, b| {
                b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }

        if let Some(limit) = filter.limit {
            tasks.truncate(limit.max(0) as usize);
        }
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        *task = data.apply_to(task);
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        let removed = tables.tasks.len() < before;
        if removed {
            tables.comments.retain(|c| c.task_id != id);
        }
        Ok(removed)
    }

    async fn set_status_for_ticket(
        &self,
        ticket_number: &str,
        status: TaskStatus,
        except_id: Uuid,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for task in tables.tasks.iter_mut().filter(|t| {
            t.id != except_id
                && t.status != status
                && t.ticket_number.as_deref() == Some(ticket_number)
        }) {
            task.status = status;
            changed += 1;
        }
        Ok(changed)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.iter().any(|t| t.id == data.task_id) {
            return Err(StoreError::MissingReference("comments_task_id_fkey".to_string()));
        }
        if !tables.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("comments_user_id_fkey".to_string()));
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            content: data.content,
            created_at: Utc::now(),
            task_id: data.task_id,
            user_id: data.user_id,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, task_ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| task_ids.contains(&c.task_id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> StoreResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.content = content.to_string();
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }

    async fn create_template(&self, data: CreateTemplate) -> StoreResult<Template> {
        let mut tables = self.tables.write().await;
        if !tables.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("templates_user_id_fkey".to_string()));
        }

        let template = Template {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            category: data.category,
            created_at: Utc::now(),
            user_id: data.user_id,
        };
        tables.templates.push(template.clone());
        Ok(template)
    }

    async fn find_template(&self, id: Uuid) -> StoreResult<Option<Template>> {
        let tables = self.tables.read().await;
        Ok(tables.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn list_templates(&self, user_id: Uuid) -> StoreResult<Vec<Template>> {
        let tables = self.tables.read().await;
        let mut templates: Vec<Template> = tables
            .templates
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.templates.len();
        tables.templates.retain(|t| t.id != id);
        Ok(tables.templates.len() < before)
    }

    async fn append_audit(&self, data: CreateAuditLog) -> StoreResult<AuditLog> {
        let mut tables = self.tables.write().await;
        if !tables.user_exists(data.user_id) {
            return Err(StoreError::MissingReference("audit_logs_user_id_fkey".to_string()));
        }

        let entry = AuditLog {
            id: Uuid::new_v4(),
            action: data.action,
            details: data.details,
            user_id: Some(data.user_id),
            created_at: Utc::now(),
        };
        tables.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(&self, limit: i64) -> StoreResult<Vec<AuditLog>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<AuditLog> = tables.audit.iter().rev().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
