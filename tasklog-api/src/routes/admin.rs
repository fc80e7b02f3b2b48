/// Administration endpoints
///
/// All routes sit behind the session layer and the admin role gate.
///
/// # Endpoints
///
/// - `GET /api/admin/users` - every user with a digest of their tasks
/// - `POST /api/admin/users` - create a user with any role
/// - `PUT /api/admin/users/:id` - edit name, email, password or role
/// - `DELETE /api/admin/users/:id` - delete a user (not oneself)
/// - `POST /api/admin/users/batch` - batch delete or role change, audited
/// - `GET /api/admin/stats` - status totals, category counts, per-user reports
/// - `GET /api/admin/tasks` - master task feed
/// - `GET /api/admin/audit` - latest audit entries

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::normalize_name, user_summaries},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tasklog_shared::{
    auth::{password::hash_password_async, session::AuthContext},
    calendar,
    models::{
        audit_log::{AuditLog, CreateAuditLog},
        task::{Task, TaskFilter, TaskOrder, TaskStatus},
        user::{normalize_email, CreateUser, Role, UpdateUser, User, UserSummary},
    },
    stats::{category_counts, user_reports, CategoryCount, StatusTotals, UserReport},
};
use uuid::Uuid;
use validator::Validate;

/// Size of the master task feed
const TASK_FEED_LIMIT: i64 = 100;

/// Entries returned by the audit endpoint
const AUDIT_LIMIT: i64 = 50;

/// The fields of a task shown in the user list
#[derive(Debug, Serialize)]
pub struct TaskDigest {
    pub status: TaskStatus,
    pub category: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub tasks: Vec<TaskDigest>,
}

impl AdminUserView {
    fn new(user: User, tasks: Vec<TaskDigest>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
            tasks,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// Blank clears the name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchAction {
    Delete,
    ChangeRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    pub action: BatchAction,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFeedQuery {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub totals: StatusTotals,
    pub category_stats: Vec<CategoryCount>,
    pub user_reports: Vec<UserReport>,
}

/// Task with its owner
#[derive(Debug, Serialize)]
pub struct OwnedTask {
    #[serde(flatten)]
    pub task: Task,
    pub user: Option<UserSummary>,
}

/// Audit entry with its actor, when the actor still exists
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub log: AuditLog,
    pub user: Option<UserSummary>,
}

/// Parses optional `startDate` / `endDate` into a half-open range
/// covering both days entirely
fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> ApiResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let day = |input: &str| {
        calendar::parse_day(input)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid date: {}", input)))
    };

    let from = start
        .filter(|s| !s.trim().is_empty())
        .map(day)
        .transpose()?
        .map(calendar::range_start);
    let until = end
        .filter(|s| !s.trim().is_empty())
        .map(day)
        .transpose()?
        .map(calendar::range_end);

    Ok((from, until))
}

/// `ALL` or nothing means every status
fn status_filter(status: Option<&str>) -> ApiResult<Option<TaskStatus>> {
    match status.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("ALL") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(ApiError::BadRequest),
    }
}

/// Lists every user, newest first, each with a digest of their tasks
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<AdminUserView>>> {
    let users = state.store.list_users(None).await?;
    let tasks = state.store.list_tasks(&TaskFilter::default()).await?;

    let mut digests: HashMap<Uuid, Vec<TaskDigest>> = HashMap::new();
    for task in tasks {
        digests.entry(task.user_id).or_default().push(TaskDigest {
            status: task.status,
            category: task.category,
            date: task.date,
        });
    }

    Ok(Json(
        users
            .into_iter()
            .map(|user| {
                let tasks = digests.remove(&user.id).unwrap_or_default();
                AdminUserView::new(user, tasks)
            })
            .collect(),
    ))
}

/// Creates a user with any role
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<Json<AdminUserView>> {
    req.validate()?;

    let email = normalize_email(&req.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let user = state
        .store
        .create_user(CreateUser {
            email,
            password_hash: hash_password_async(req.password).await?,
            name: normalize_name(req.name),
            role: req.role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, admin_id = %auth.user_id, "User created by admin");

    Ok(Json(AdminUserView::new(user, Vec::new())))
}

/// Edits a user; only the supplied fields change
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<AdminUserView>> {
    req.validate()?;

    let password_hash = match req.password {
        Some(password) => Some(hash_password_async(password).await?),
        None => None,
    };

    let update = UpdateUser {
        email: req.email.as_deref().map(normalize_email),
        password_hash,
        name: req.name.map(|n| normalize_name(Some(n))),
        role: req.role,
    };

    let user = state
        .store
        .update_user(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, admin_id = %auth.user_id, "User updated by admin");

    Ok(Json(AdminUserView::new(user, Vec::new())))
}

/// Deletes a user along with their tasks, comments and templates
///
/// # Errors
///
/// - `400 Bad Request`: the admin targeted their own account
/// - `404 Not Found`: no such user
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if id == auth.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    if !state.store.delete_user(id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, admin_id = %auth.user_id, "User deleted by admin");

    Ok(Json(json!({ "success": true })))
}

/// Batch delete or role change
///
/// A batch delete silently leaves the caller's own account out. Each batch
/// appends one audit entry recording how many accounts it touched.
pub async fn batch_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    if req.user_ids.is_empty() {
        return Err(ApiError::BadRequest("No users selected".to_string()));
    }

    let (count, entry) = match req.action {
        BatchAction::Delete => {
            let targets: Vec<Uuid> = req
                .user_ids
                .iter()
                .copied()
                .filter(|id| *id != auth.user_id)
                .collect();

            let count = if targets.is_empty() {
                0
            } else {
                state.store.delete_users(&targets).await?
            };
            (count, CreateAuditLog::batch_delete(auth.user_id, count as usize))
        }
        BatchAction::ChangeRole => {
            let role = req
                .role
                .ok_or_else(|| ApiError::BadRequest("Role required".to_string()))?;

            let count = state.store.set_role_for_users(&req.user_ids, role).await?;
            (count, CreateAuditLog::batch_role_change(auth.user_id, role, count as usize))
        }
    };

    let log = state.store.append_audit(entry).await?;
    tracing::info!(
        admin_id = %auth.user_id,
        action = %log.action,
        count,
        "Batch user operation"
    );

    Ok(Json(BatchResponse {
        success: true,
        count,
    }))
}

/// Aggregate statistics over an optional date range
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let (date_from, date_until) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;

    let tasks = state
        .store
        .list_tasks(&TaskFilter {
            date_from,
            date_until,
            ..Default::default()
        })
        .await?;
    let users = state.store.list_users(Some(Role::User)).await?;

    Ok(Json(StatsResponse {
        totals: StatusTotals::from_tasks(&tasks),
        category_stats: category_counts(&tasks),
        user_reports: user_reports(&users, &tasks),
    }))
}

/// Master task feed across all users
pub async fn tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskFeedQuery>,
) -> ApiResult<Json<Vec<OwnedTask>>> {
    let (date_from, date_until) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;

    let tasks = state
        .store
        .list_tasks(&TaskFilter {
            status: status_filter(query.status.as_deref())?,
            date_from,
            date_until,
            order: TaskOrder::DateDesc,
            limit: Some(TASK_FEED_LIMIT),
            ..Default::default()
        })
        .await?;

    let owners = user_summaries(state.store.as_ref(), tasks.iter().map(|t| t.user_id)).await?;

    Ok(Json(
        tasks
            .into_iter()
            .map(|task| OwnedTask {
                user: owners.get(&task.user_id).cloned(),
                task,
            })
            .collect(),
    ))
}

/// Latest audit entries, newest first
pub async fn audit(State(state): State<AppState>) -> ApiResult<Json<Vec<AuditEntry>>> {
    let logs = state.store.list_audit(AUDIT_LIMIT).await?;
    let actors = user_summaries(state.store.as_ref(), logs.iter().filter_map(|l| l.user_id)).await?;

    Ok(Json(
        logs.into_iter()
            .map(|log| AuditEntry {
                user: log.user_id.and_then(|id| actors.get(&id).cloned()),
                log,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("ALL")).unwrap(), None);
        assert_eq!(status_filter(Some("")).unwrap(), None);
        assert_eq!(
            status_filter(Some("COMPLETED")).unwrap(),
            Some(TaskStatus::Completed)
        );
        assert!(status_filter(Some("FINISHED")).is_err());
    }

    #[test]
    fn test_date_range_covers_whole_days() {
        let (from, until) = date_range(Some("2024-03-01"), Some("2024-03-31")).unwrap();
        assert_eq!(from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(until.unwrap().to_rfc3339(), "2024-04-01T00:00:00+00:00");

        assert_eq!(date_range(None, Some(" ")).unwrap(), (None, None));
        assert!(date_range(Some("March"), None).is_err());
    }

    #[test]
    fn test_batch_request_wire_format() {
        let req: BatchRequest = serde_json::from_str(
            r#"{"userIds":[],"action":"CHANGE_ROLE","role":"ADMIN"}"#,
        )
        .unwrap();
        assert_eq!(req.action, BatchAction::ChangeRole);
        assert_eq!(req.role, Some(Role::Admin));
    }

    #[test]
    fn test_update_request_validation() {
        let req = UpdateUserRequest {
            password: Some("short".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
        assert!(UpdateUserRequest::default().validate().is_ok());
    }
}
