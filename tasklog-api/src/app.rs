/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasklog_api::{app::{build_router, AppState}, config::Config};
/// use tasklog_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{page_gate::page_gate_layer, security::SecurityHeadersLayer},
};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tasklog_shared::{
    auth::{authorization::require_role, middleware::create_session_middleware, session::AuthContext},
    models::user::Role,
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; both fields are
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend (PostgreSQL or in-memory)
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Whether the session cookie carries the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # public
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register           # public
///     │   ├── POST /login              # public
///     │   ├── POST /logout             # public
///     │   └── GET  /me                 # session
///     ├── /tasks                       # session
///     │   ├── GET, POST /
///     │   ├── PUT, DELETE /:id
///     │   └── GET, POST /:id/comments
///     ├── /comments/:id                # session: PUT, DELETE
///     ├── /templates                   # session: GET, POST, DELETE /:id
///     ├── /analytics                   # session
///     └── /admin/                      # session + ADMIN role
///         ├── GET, POST /users
///         ├── PUT, DELETE /users/:id
///         ├── POST /users/batch
///         ├── GET /stats
///         ├── GET /tasks
///         └── GET /audit
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, page gate, then the
/// per-group session and role layers.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let session = axum_middleware::from_fn(create_session_middleware(state.jwt_secret().to_string()));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let session_auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(session.clone());

    let user_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route(
            "/tasks/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/comments/:id",
            put(routes::comments::update_comment).delete(routes::comments::delete_comment),
        )
        .route(
            "/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route(
            "/templates/:id",
            axum::routing::delete(routes::templates::delete_template),
        )
        .route("/analytics", get(routes::analytics::analytics))
        .layer(session.clone());

    let admin_routes = Router::new()
        .route(
            "/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route(
            "/users/:id",
            put(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        .route("/users/batch", post(routes::admin::batch_users))
        .route("/stats", get(routes::admin::stats))
        .route("/tasks", get(routes::admin::tasks))
        .route("/audit", get(routes::admin::audit))
        .layer(axum_middleware::from_fn(admin_gate))
        .layer(session);

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_auth_routes))
        .nest("/admin", admin_routes)
        .merge(user_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            page_gate_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Role gate for the admin API
///
/// Runs inside the session layer, so a missing [`AuthContext`] means the
/// router was assembled wrongly rather than that the caller is anonymous.
async fn admin_gate(req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    if let Err(e) = require_role(auth, Role::Admin) {
        tracing::debug!(user_id = %auth.user_id, "Rejected non-admin on admin route");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
