/// Comment endpoints
///
/// - `GET /api/tasks/:id/comments` - thread, oldest first
/// - `POST /api/tasks/:id/comments` - add a comment
/// - `PUT /api/comments/:id` - edit (author or admin)
/// - `DELETE /api/comments/:id` - delete (author, task owner or admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::user_summaries,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tasklog_shared::{
    auth::{
        authorization::{require_any_owner_or_admin, require_owner_or_admin},
        session::AuthContext,
    },
    models::{
        comment::{Comment, CreateComment},
        user::UserSummary,
    },
};
use uuid::Uuid;

/// Comment with its author's name and email
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,

    pub user: Option<UserSummary>,
}

impl CommentView {
    pub fn with_authors(comments: Vec<Comment>, authors: &HashMap<Uuid, UserSummary>) -> Vec<Self> {
        comments
            .into_iter()
            .map(|comment| {
                let user = authors.get(&comment.user_id).cloned();
                Self { comment, user }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

fn required_content(req: CommentRequest) -> ApiResult<String> {
    req.content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Comment content required".to_string()))
}

async fn author_view(state: &AppState, comment: Comment) -> ApiResult<CommentView> {
    let authors = user_summaries(state.store.as_ref(), [comment.user_id]).await?;
    let user = authors.get(&comment.user_id).cloned();
    Ok(CommentView { comment, user })
}

/// Comments of a task, oldest first
///
/// Open to any authenticated user.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentView>>> {
    state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comments = state.store.list_comments(&[task_id]).await?;
    let authors = user_summaries(state.store.as_ref(), comments.iter().map(|c| c.user_id)).await?;

    Ok(Json(CommentView::with_authors(comments, &authors)))
}

/// Adds a comment to a task
///
/// # Errors
///
/// - `400 Bad Request`: blank content
/// - `404 Not Found`: no such task
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentView>> {
    let content = required_content(req)?;

    state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comment = state
        .store
        .create_comment(CreateComment {
            task_id,
            user_id: auth.user_id,
            content,
        })
        .await?;

    tracing::debug!(comment_id = %comment.id, task_id = %task_id, "Comment added");

    Ok(Json(author_view(&state, comment).await?))
}

/// Edits a comment; author or admin only
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<CommentView>> {
    let content = required_content(req)?;

    let comment = state
        .store
        .find_comment(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    require_owner_or_admin(&auth, comment.user_id)?;

    let updated = state
        .store
        .update_comment(id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(author_view(&state, updated).await?))
}

/// Deletes a comment; author, owner of the task, or admin
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let comment = state
        .store
        .find_comment(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    let mut rights_holders = vec![comment.user_id];
    if let Some(task) = state.store.find_task(comment.task_id).await? {
        rights_holders.push(task.user_id);
    }
    require_any_owner_or_admin(&auth, &rights_holders)?;

    if !state.store.delete_comment(id).await? {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}
