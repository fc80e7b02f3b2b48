/// Database models for tasklog
///
/// Each model carries its own PostgreSQL queries as associated functions
/// taking a `&PgPool`. Handlers do not call these directly; they go through
/// the [`crate::store::Store`] trait, whose PostgreSQL implementation
/// delegates here.
///
/// # Models
///
/// - `user`: accounts and roles
/// - `task`: logged work items
/// - `comment`: per-task comment thread
/// - `template`: reusable task presets
/// - `audit_log`: append-only record of admin batch actions

pub mod audit_log;
pub mod comment;
pub mod task;
pub mod template;
pub mod user;
