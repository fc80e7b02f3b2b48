/// API route handlers
///
/// - `health`: health check
/// - `auth`: register, login, logout, profile
/// - `tasks`: task CRUD with duplicate detection and ticket propagation
/// - `comments`: per-task comment threads
/// - `templates`: task presets
/// - `analytics`: category totals and per-user activity
/// - `admin`: user management, statistics, task feed, audit log

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod comments;
pub mod health;
pub mod tasks;
pub mod templates;

use std::collections::HashMap;
use tasklog_shared::{models::user::UserSummary, store::Store};
use uuid::Uuid;

use crate::error::ApiResult;

/// Name/email summaries for the given users, keyed by id
///
/// Ids that no longer resolve are simply absent from the map.
pub(crate) async fn user_summaries(
    store: &dyn Store,
    ids: impl IntoIterator<Item = Uuid>,
) -> ApiResult<HashMap<Uuid, UserSummary>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(store
        .find_users(&ids)
        .await?
        .iter()
        .map(|user| (user.id, user.summary()))
        .collect())
}
