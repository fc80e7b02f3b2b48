/// Analytics endpoint
///
/// ```text
/// GET /api/analytics
/// ```
///
/// Open to any authenticated user. Returns task counts per category across
/// all users, and every user's logged tasks ordered by display name.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use tasklog_shared::{
    auth::session::AuthContext,
    models::task::TaskFilter,
    stats::{global_category_stats, user_activity, UserActivity},
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub current_user_id: Uuid,
    pub global_stats: BTreeMap<String, u64>,
    pub user_activity: Vec<UserActivity>,
}

pub async fn analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let users = state.store.list_users(None).await?;
    let tasks = state.store.list_tasks(&TaskFilter::default()).await?;

    Ok(Json(AnalyticsResponse {
        current_user_id: auth.user_id,
        global_stats: global_category_stats(&tasks),
        user_activity: user_activity(&users, &tasks),
    }))
}
