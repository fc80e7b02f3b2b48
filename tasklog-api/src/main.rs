//! # Tasklog API Server
//!
//! Task logging service for support teams: users log daily work items,
//! administrators manage accounts and review aggregate statistics.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tasklog JWT_SECRET=... cargo run -p tasklog-api
//! ```
//!
//! `DATABASE_URL=memory` runs against the in-process store.

use std::sync::Arc;
use tasklog_api::{
    app::{build_router, AppState},
    bootstrap::ensure_admin,
    config::Config,
};
use tasklog_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, get_pool_stats, DatabaseConfig},
    },
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "tasklog_api=debug,tasklog_shared=info,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Tasklog API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let mut pool = None;
    let store: Arc<dyn Store> = if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pg = create_pool(
            DatabaseConfig::new(config.database.url.clone())
                .with_max_connections(config.database.max_connections),
        )
        .await?;

        if config.database.run_migrations {
            run_migrations(&pg).await?;
        }

        let stats = get_pool_stats(&pg);
        tracing::info!(
            total_connections = stats.total_connections,
            idle_connections = stats.idle_connections,
            "Database ready"
        );

        pool = Some(pg.clone());
        Arc::new(PgStore::new(pg))
    };

    if let Some(admin) = &config.admin {
        ensure_admin(store.as_ref(), admin).await?;
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
