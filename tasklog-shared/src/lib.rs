//! # tasklog shared library
//!
//! Types, persistence and business rules used by the tasklog API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `store`: persistence trait with PostgreSQL and in-memory implementations
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, session tokens, role gates
//! - `ticket`: duplicate detection and ticket status propagation
//! - `stats`: reporting aggregates
//! - `calendar`: UTC calendar-day helpers

pub mod auth;
pub mod calendar;
pub mod db;
pub mod models;
pub mod stats;
pub mod store;
pub mod ticket;

/// Current version of the tasklog shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
