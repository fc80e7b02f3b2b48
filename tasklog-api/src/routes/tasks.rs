/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks?category=&date=YYYY-MM-DD` - caller's tasks
/// - `POST /api/tasks` - log a task
/// - `PUT /api/tasks/:id` - partial update (owner or admin)
/// - `DELETE /api/tasks/:id` - delete (owner or admin)
///
/// Every write runs duplicate detection first and ticket status
/// propagation after; see [`tasklog_shared::ticket`].

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{comments::CommentView, user_summaries},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tasklog_shared::{
    auth::{
        authorization::{require_owner_or_admin, require_role},
        session::AuthContext,
    },
    calendar,
    models::{
        comment::Comment,
        task::{normalize_ticket, CreateTask, Task, TaskFilter, TaskStatus, UpdateTask, DEFAULT_CATEGORY},
        user::{Role, UserSummary},
    },
    store::{Store, TaskInsert},
    ticket::{create_unless_duplicate, find_duplicate, propagate_status_best_effort, DuplicateProbe},
};
use uuid::Uuid;

/// Task with its owner and comment thread
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,

    pub user: Option<UserSummary>,

    pub comments: Vec<CommentView>,
}

/// Response to a create or update
#[derive(Debug, Serialize)]
pub struct TaskWriteResponse {
    #[serde(flatten)]
    pub task: TaskView,

    /// Other tasks whose status was synchronised by this write
    pub propagated: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub category: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub description: Option<String>,
    pub category: Option<String>,
    pub ticket_number: Option<String>,
    pub status: Option<TaskStatus>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub description: Option<String>,
    pub category: Option<String>,

    /// Absent leaves the ticket alone; `null` or blank clears it
    #[serde(default, deserialize_with = "present")]
    pub ticket_number: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub date: Option<String>,
}

/// Distinguishes an explicit `null` from an absent field
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn parse_task_date(input: &str) -> ApiResult<chrono::DateTime<Utc>> {
    calendar::parse_timestamp(input)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid date: {}", input)))
}

fn normalize_category(category: Option<String>) -> Option<String> {
    category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

impl UpdateTaskRequest {
    fn into_update(self) -> ApiResult<UpdateTask> {
        let description = match self.description.as_deref().map(str::trim) {
            Some("") => {
                return Err(ApiError::BadRequest("Description cannot be empty".to_string()))
            }
            other => other.map(str::to_string),
        };

        Ok(UpdateTask {
            description,
            category: normalize_category(self.category),
            ticket_number: self.ticket_number.map(|t| normalize_ticket(t.as_deref())),
            status: self.status,
            date: self.date.as_deref().map(parse_task_date).transpose()?,
        })
    }
}

/// Attaches owners and comments to tasks, preserving their order
pub(crate) async fn task_views(store: &dyn Store, tasks: Vec<Task>) -> ApiResult<Vec<TaskView>> {
    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let comments = if task_ids.is_empty() {
        Vec::new()
    } else {
        store.list_comments(&task_ids).await?
    };

    let people = user_summaries(
        store,
        tasks
            .iter()
            .map(|t| t.user_id)
            .chain(comments.iter().map(|c| c.user_id)),
    )
    .await?;

    let mut threads: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for comment in comments {
        threads.entry(comment.task_id).or_default().push(comment);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let thread = threads.remove(&task.id).unwrap_or_default();
            TaskView {
                user: people.get(&task.user_id).cloned(),
                comments: CommentView::with_authors(thread, &people),
                task,
            }
        })
        .collect())
}

async fn write_response(store: &dyn Store, task: Task, propagated: u64) -> ApiResult<TaskWriteResponse> {
    let view = task_views(store, vec![task])
        .await?
        .pop()
        .ok_or_else(|| ApiError::InternalError("Task view missing".to_string()))?;

    Ok(TaskWriteResponse {
        task: view,
        propagated,
    })
}

fn duplicate_conflict(user_id: Uuid, existing: &Task) -> ApiError {
    tracing::debug!(
        user_id = %user_id,
        existing_id = %existing.id,
        "Rejected duplicate task"
    );
    ApiError::Conflict("A task with the same details already exists for this day".to_string())
}

async fn reject_duplicate(store: &dyn Store, probe: &DuplicateProbe) -> ApiResult<()> {
    match find_duplicate(store, probe).await? {
        Some(existing) => Err(duplicate_conflict(probe.user_id, &existing)),
        None => Ok(()),
    }
}

/// Lists the caller's tasks, newest first
///
/// # Errors
///
/// - `400 Bad Request`: unparseable `date`
/// - `403 Forbidden`: caller is an admin
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    require_role(&auth, Role::User)?;

    let mut filter = TaskFilter {
        user_id: Some(auth.user_id),
        category: normalize_category(query.category),
        ..Default::default()
    };

    if let Some(date) = query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        let day = calendar::parse_day(date)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid date: {}", date)))?;
        let (from, until) = calendar::day_bounds(day);
        filter.date_from = Some(from);
        filter.date_until = Some(until);
    }

    let tasks = state.store.list_tasks(&filter).await?;
    Ok(Json(task_views(state.store.as_ref(), tasks).await?))
}

/// Logs a task for the caller
///
/// # Errors
///
/// - `400 Bad Request`: missing description or bad date
/// - `403 Forbidden`: caller is an admin
/// - `409 Conflict`: same-day duplicate
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<TaskWriteResponse>> {
    require_role(&auth, Role::User)?;

    let description = req
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Description required".to_string()))?;

    let data = CreateTask {
        user_id: auth.user_id,
        description,
        category: normalize_category(req.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        ticket_number: normalize_ticket(req.ticket_number.as_deref()),
        status: req.status.unwrap_or_default(),
        date: match req.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(date) => parse_task_date(date)?,
            None => Utc::now(),
        },
    };

    let task = match create_unless_duplicate(state.store.as_ref(), data).await? {
        TaskInsert::Created(task) => task,
        TaskInsert::Duplicate(existing) => return Err(duplicate_conflict(auth.user_id, &existing)),
    };
    tracing::info!(task_id = %task.id, user_id = %auth.user_id, category = %task.category, "Task created");

    let propagated = if task.syncs_ticket() {
        propagate_status_best_effort(state.store.as_ref(), &task).await
    } else {
        0
    };

    Ok(Json(write_response(state.store.as_ref(), task, propagated).await?))
}

/// Partially updates a task
///
/// # Errors
///
/// - `403 Forbidden`: neither owner nor admin
/// - `404 Not Found`: no such task
/// - `409 Conflict`: the edited task would duplicate another
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskWriteResponse>> {
    let existing = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_owner_or_admin(&auth, existing.user_id)?;

    let update = req.into_update()?;
    let proposed = update.apply_to(&existing);
    reject_duplicate(state.store.as_ref(), &DuplicateProbe::for_existing(&proposed)).await?;

    let task = state
        .store
        .update_task(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let sync_relevant =
        task.status != existing.status || task.ticket_number != existing.ticket_number;
    let propagated = if sync_relevant && task.syncs_ticket() {
        propagate_status_best_effort(state.store.as_ref(), &task).await
    } else {
        0
    };

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, propagated, "Task updated");

    Ok(Json(write_response(state.store.as_ref(), task, propagated).await?))
}

/// Deletes a task and its comments
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let task = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_owner_or_admin(&auth, task.user_id)?;

    if !state.store.delete_task(id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");

    Ok(Json(json!({ "success": true })))
}
