/// Task templates: named presets a user can fill a new task from

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tasklog_shared::{
    auth::session::AuthContext,
    models::template::{CreateTemplate, Template},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// The caller's templates, newest first
pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(state.store.list_templates(auth.user_id).await?))
}

pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<Json<Template>> {
    let (Some(name), Some(description)) = (non_blank(req.name), non_blank(req.description)) else {
        return Err(ApiError::BadRequest("Name and description required".to_string()));
    };

    let template = state
        .store
        .create_template(CreateTemplate {
            user_id: auth.user_id,
            name,
            description,
            category: non_blank(req.category),
        })
        .await?;

    tracing::debug!(template_id = %template.id, user_id = %auth.user_id, "Template created");

    Ok(Json(template))
}

/// Deletes one of the caller's templates
///
/// Someone else's template answers 404 rather than 403, so template ids
/// cannot be probed.
pub async fn delete_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let not_found = || ApiError::NotFound("Template not found".to_string());

    let template = state.store.find_template(id).await?.ok_or_else(not_found)?;
    if template.user_id != auth.user_id {
        return Err(not_found());
    }

    if !state.store.delete_template(id).await? {
        return Err(not_found());
    }

    Ok(Json(json!({ "success": true })))
}
