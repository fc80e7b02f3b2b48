/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Queries live on the models; see [`crate::models`].

pub mod migrations;
pub mod pool;
