//! Duplicate detection and ticket status propagation
//!
//! Two rules run whenever a task is written:
//!
//! 1. **Duplicate rejection**: a user may not log two tasks on the same UTC
//!    calendar day with the same category and the same ticket number, or,
//!    when there is no ticket number, the same description.
//! 2. **Ticket propagation**: when a task in [`TICKET_CATEGORY`] carrying a
//!    ticket number is written, every other task (any user, any category)
//!    with that ticket number takes the same status.
//!
//! Propagation is best effort. The write that triggered it has already
//! been committed, so a failure here is logged and reported as zero tasks
//! changed rather than surfaced to the caller.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub use crate::calendar::day_bounds;
use crate::models::task::{CreateTask, Task, TaskFilter, TICKET_CATEGORY};
use crate::store::{Store, StoreResult, TaskInsert};

/// What two tasks must share to count as duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateKey {
    Ticket(String),
    Description(String),
}

/// A prospective task, reduced to the fields duplicate detection looks at
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateProbe {
    pub user_id: Uuid,
    pub category: String,
    pub key: DuplicateKey,
    pub day: NaiveDate,

    /// The task being updated, which must not match itself
    pub exclude_id: Option<Uuid>,
}

impl DuplicateProbe {
    /// Probe for a task about to be created
    ///
    /// The ticket number is the key when present and non-blank; otherwise
    /// the trimmed description is.
    pub fn for_task(
        user_id: Uuid,
        category: &str,
        ticket_number: Option<&str>,
        description: &str,
        date: DateTime<Utc>,
    ) -> Self {
        let key = match ticket_number.map(str::trim).filter(|t| !t.is_empty()) {
            Some(ticket) => DuplicateKey::Ticket(ticket.to_string()),
            None => DuplicateKey::Description(description.trim().to_string()),
        };

        Self {
            user_id,
            category: category.to_string(),
            key,
            day: date.date_naive(),
            exclude_id: None,
        }
    }

    /// Probe for an existing (possibly just-edited) task, excluding itself
    pub fn for_existing(task: &Task) -> Self {
        Self::for_task(
            task.user_id,
            &task.category,
            task.ticket_number.as_deref(),
            &task.description,
            task.date,
        )
        .excluding(task.id)
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    /// Store filter selecting the tasks this probe collides with
    pub fn filter(&self) -> TaskFilter {
        let (date_from, date_until) = day_bounds(self.day);
        let (ticket_number, description) = match &self.key {
            DuplicateKey::Ticket(ticket) => (Some(ticket.clone()), None),
            DuplicateKey::Description(description) => (None, Some(description.clone())),
        };

        TaskFilter {
            user_id: Some(self.user_id),
            category: Some(self.category.clone()),
            ticket_number,
            description,
            date_from: Some(date_from),
            date_until: Some(date_until),
            exclude_id: self.exclude_id,
            limit: Some(1),
            ..Default::default()
        }
    }
}

/// Returns an existing task the probe collides with, if any
pub async fn find_duplicate(
    store: &dyn Store,
    probe: &DuplicateProbe,
) -> StoreResult<Option<Task>> {
    let mut matches = store.list_tasks(&probe.filter()).await?;
    Ok(matches.pop())
}

/// Inserts `data` unless it would duplicate a task logged earlier
///
/// The check and the insert run as one step in the store, so a
/// double-submitted form creates a single task.
pub async fn create_unless_duplicate(store: &dyn Store, data: CreateTask) -> StoreResult<TaskInsert> {
    let probe = DuplicateProbe::for_task(
        data.user_id,
        &data.category,
        data.ticket_number.as_deref(),
        &data.description,
        data.date,
    );
    store.create_task_unless_duplicate(data, &probe.filter()).await
}

/// Pushes `task`'s status to every other task sharing its ticket number
///
/// Does nothing (and returns 0) unless the task is in [`TICKET_CATEGORY`]
/// and carries a ticket number. Returns the number of tasks changed.
pub async fn propagate_status(store: &dyn Store, task: &Task) -> StoreResult<u64> {
    if task.category != TICKET_CATEGORY {
        return Ok(0);
    }
    let Some(ticket) = task.ticket_number.as_deref() else {
        return Ok(0);
    };

    let changed = store
        .set_status_for_ticket(ticket, task.status, task.id)
        .await?;

    if changed > 0 {
        tracing::info!(
            task_id = %task.id,
            ticket_number = ticket,
            status = %task.status,
            changed,
            "Propagated ticket status"
        );
    }

    Ok(changed)
}

/// [`propagate_status`] with failures logged and counted as zero
pub async fn propagate_status_best_effort(store: &dyn Store, task: &Task) -> u64 {
    match propagate_status(store, task).await {
        Ok(changed) => changed,
        Err(e) => {
            tracing::warn!(
                task_id = %task.id,
                ticket_number = ?task.ticket_number,
                error = %e,
                "Ticket status propagation failed"
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskStatus, UpdateTask};
    use crate::models::user::{CreateUser, Role};
    use crate::store::MemoryStore;
    use chrono::Duration;

    async fn seed_user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                name: None,
                role: Role::User,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_task(
        store: &MemoryStore,
        user_id: Uuid,
        category: &str,
        ticket: Option<&str>,
        description: &str,
        date: DateTime<Utc>,
    ) -> Task {
        store
            .create_task(CreateTask {
                user_id,
                description: description.to_string(),
                category: category.to_string(),
                ticket_number: ticket.map(str::to_string),
                status: TaskStatus::Pending,
                date,
            })
            .await
            .unwrap()
    }

    fn noon() -> DateTime<Utc> {
        crate::calendar::parse_timestamp("2024-05-10T12:00:00Z").unwrap()
    }

    #[test]
    fn test_probe_prefers_ticket_number() {
        let user = Uuid::new_v4();
        let probe = DuplicateProbe::for_task(user, "Axios", Some(" AX-1 "), "desc", noon());
        assert_eq!(probe.key, DuplicateKey::Ticket("AX-1".to_string()));

        let probe = DuplicateProbe::for_task(user, "Axios", Some("  "), " Fixed login ", noon());
        assert_eq!(probe.key, DuplicateKey::Description("Fixed login".to_string()));
    }

    #[test]
    fn test_probe_filter_spans_the_day() {
        let probe = DuplicateProbe::for_task(Uuid::new_v4(), "Whatsapp", None, "Replied", noon());
        let filter = probe.filter();

        assert_eq!(filter.date_from.unwrap().to_rfc3339(), "2024-05-10T00:00:00+00:00");
        assert_eq!(filter.date_until.unwrap().to_rfc3339(), "2024-05-11T00:00:00+00:00");
        assert_eq!(filter.description.as_deref(), Some("Replied"));
        assert!(filter.ticket_number.is_none());
        assert_eq!(filter.limit, Some(1));
    }

    #[tokio::test]
    async fn test_same_day_ticket_is_a_duplicate() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;
        let existing = seed_task(&store, ana, "Axios", Some("AX-1"), "First", noon()).await;

        let later_same_day = noon() + Duration::hours(3);
        let probe = DuplicateProbe::for_task(ana, "Axios", Some("AX-1"), "Second", later_same_day);
        let found = find_duplicate(&store, &probe).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(existing.id));
    }

    #[tokio::test]
    async fn test_padded_stored_description_is_found() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;
        let existing = seed_task(&store, ana, "Whatsapp", None, "Team sync ", noon()).await;

        let probe = DuplicateProbe::for_task(ana, "Whatsapp", None, "Team sync", noon());
        let found = find_duplicate(&store, &probe).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(existing.id));
    }

    #[tokio::test]
    async fn test_concurrent_identical_creates_insert_once() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let ana = seed_user(&store, "ana@example.com").await;
        let data = CreateTask {
            user_id: ana,
            description: "Team sync".to_string(),
            category: "Whatsapp".to_string(),
            ticket_number: None,
            status: TaskStatus::Pending,
            date: noon(),
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let data = data.clone();
                tokio::spawn(async move { create_unless_duplicate(store.as_ref(), data).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if let TaskInsert::Created(_) = handle.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let all = store
            .list_tasks(&TaskFilter {
                user_id: Some(ana),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_no_duplicate_across_days_users_or_categories() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;
        let bob = seed_user(&store, "bob@example.com").await;
        seed_task(&store, ana, "Axios", Some("AX-1"), "First", noon()).await;

        let next_day = DuplicateProbe::for_task(ana, "Axios", Some("AX-1"), "x", noon() + Duration::days(1));
        let other_user = DuplicateProbe::for_task(bob, "Axios", Some("AX-1"), "x", noon());
        let other_category = DuplicateProbe::for_task(ana, "Releases", Some("AX-1"), "x", noon());

        for probe in [next_day, other_user, other_category] {
            assert!(find_duplicate(&store, &probe).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_description_duplicate_and_self_exclusion() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;
        let task = seed_task(&store, ana, "Other Task", None, "Team sync", noon()).await;

        let probe = DuplicateProbe::for_task(ana, "Other Task", None, "Team sync ", noon());
        assert!(find_duplicate(&store, &probe).await.unwrap().is_some());

        let probe = DuplicateProbe::for_existing(&task);
        assert!(find_duplicate(&store, &probe).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_propagation_updates_every_other_holder() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;
        let bob = seed_user(&store, "bob@example.com").await;

        let origin = seed_task(&store, ana, "Axios", Some("AX-7"), "Deploy", noon()).await;
        let peer = seed_task(&store, bob, "Axios", Some("AX-7"), "Deploy", noon()).await;
        let other_category = seed_task(&store, bob, "Monitoring", Some("AX-7"), "Watch", noon()).await;

        let origin = store
            .update_task(
                origin.id,
                UpdateTask {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(propagate_status(&store, &origin).await.unwrap(), 2);
        for id in [peer.id, other_category.id] {
            let task = store.find_task(id).await.unwrap().unwrap();
            assert_eq!(task.status, TaskStatus::Completed);
        }

        // Already consistent
        assert_eq!(propagate_status_best_effort(&store, &origin).await, 0);
    }

    #[tokio::test]
    async fn test_propagation_skips_other_categories_and_missing_tickets() {
        let store = MemoryStore::new();
        let ana = seed_user(&store, "ana@example.com").await;

        let mut releases = seed_task(&store, ana, "Releases", Some("R-1"), "Ship", noon()).await;
        let peer = seed_task(&store, ana, "Axios", Some("R-1"), "Ship", noon()).await;
        releases.status = TaskStatus::Completed;
        assert_eq!(propagate_status(&store, &releases).await.unwrap(), 0);

        let mut no_ticket = seed_task(&store, ana, "Axios", None, "Triage", noon()).await;
        no_ticket.status = TaskStatus::InProgress;
        assert_eq!(propagate_status(&store, &no_ticket).await.unwrap(), 0);

        let peer = store.find_task(peer.id).await.unwrap().unwrap();
        assert_eq!(peer.status, TaskStatus::Pending);
    }
}
