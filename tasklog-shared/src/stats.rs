//! Reporting aggregates
//!
//! Reports are computed per request from plain task and user lists, so the
//! same code serves both store implementations. Every function here is pure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::models::task::{Task, TaskStatus, KNOWN_CATEGORIES};
use crate::models::user::User;

/// Task counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotals {
    pub total_tasks: u64,
    pub pending_tasks: u64,
    pub in_progress_tasks: u64,
    pub completed_tasks: u64,
}

impl StatusTotals {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut totals, task| {
            totals.total_tasks += 1;
            match task.status {
                TaskStatus::Pending => totals.pending_tasks += 1,
                TaskStatus::InProgress => totals.in_progress_tasks += 1,
                TaskStatus::Completed => totals.completed_tasks += 1,
            }
            totals
        })
    }
}

/// One bar of a category chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub value: u64,
}

/// Counts for the known categories, in display order, zeros included
pub fn category_counts(tasks: &[Task]) -> Vec<CategoryCount> {
    KNOWN_CATEGORIES
        .iter()
        .map(|&category| CategoryCount {
            name: category.to_string(),
            value: tasks.iter().filter(|t| t.category == category).count() as u64,
        })
        .collect()
}

/// Like [`category_counts`], followed by any other categories the tasks
/// use, in order of first appearance
pub fn category_breakdown<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = KNOWN_CATEGORIES
        .iter()
        .map(|&name| CategoryCount {
            name: name.to_string(),
            value: 0,
        })
        .collect();

    for task in tasks {
        match counts.iter_mut().find(|c| c.name == task.category) {
            Some(count) => count.value += 1,
            None => counts.push(CategoryCount {
                name: task.category.clone(),
                value: 1,
            }),
        }
    }

    counts
}

/// Category name to task count; the known categories are always present
pub fn global_category_stats(tasks: &[Task]) -> BTreeMap<String, u64> {
    let mut stats: BTreeMap<String, u64> = KNOWN_CATEGORIES
        .iter()
        .map(|&name| (name.to_string(), 0))
        .collect();

    for task in tasks {
        *stats.entry(task.category.clone()).or_insert(0) += 1;
    }

    stats
}

/// Per-user row of the admin statistics page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub total_tasks: u64,
    pub last_login: Option<DateTime<Utc>>,
    pub chart_data: Vec<CategoryCount>,
}

fn tasks_by_owner(tasks: &[Task]) -> HashMap<Uuid, Vec<&Task>> {
    let mut owned: HashMap<Uuid, Vec<&Task>> = HashMap::new();
    for task in tasks {
        owned.entry(task.user_id).or_default().push(task);
    }
    owned
}

/// Newest login first; users who never logged in come last
fn by_last_login_desc(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Builds one report per user from `tasks` (already restricted to the
/// reporting window), ordered by last login
pub fn user_reports(users: &[User], tasks: &[Task]) -> Vec<UserReport> {
    let owned = tasks_by_owner(tasks);

    let mut reports: Vec<UserReport> = users
        .iter()
        .map(|user| {
            let user_tasks = owned.get(&user.id).map(Vec::as_slice).unwrap_or_default();
            UserReport {
                id: user.id,
                name: user
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                email: user.email.clone(),
                total_tasks: user_tasks.len() as u64,
                last_login: user.last_login,
                chart_data: category_breakdown(user_tasks.iter().copied()),
            }
        })
        .collect();

    reports.sort_by(|a, b| by_last_login_desc(&a.last_login, &b.last_login));
    reports
}

/// Task as listed in the analytics activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTask {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub ticket_number: Option<String>,
    pub status: TaskStatus,
    pub date: DateTime<Utc>,
}

impl From<&Task> for ActivityTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            description: task.description.clone(),
            category: task.category.clone(),
            ticket_number: task.ticket_number.clone(),
            status: task.status,
            date: task.date,
        }
    }
}

/// One user's work as shown on the analytics page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub id: Uuid,
    pub name: String,
    pub total_tasks: u64,
    pub tasks: Vec<ActivityTask>,
}

/// Activity of every user, ordered by display name, each with their tasks
/// newest `date` first
pub fn user_activity(users: &[User], tasks: &[Task]) -> Vec<UserActivity> {
    let owned = tasks_by_owner(tasks);

    let mut activity: Vec<UserActivity> = users
        .iter()
        .map(|user| {
            let mut user_tasks: Vec<&Task> = owned.get(&user.id).cloned().unwrap_or_default();
            user_tasks.sort_by(|a, b| b.date.cmp(&a.date));

            UserActivity {
                id: user.id,
                name: user.display_name().to_string(),
                total_tasks: user_tasks.len() as u64,
                tasks: user_tasks.into_iter().map(ActivityTask::from).collect(),
            }
        })
        .collect();

    activity.sort_by_cached_key(|a| a.name.to_lowercase());
    activity
}
