/// Configuration management for the API server
///
/// Configuration comes from environment variables; a `.env` file in the
/// working directory is loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS and `Secure` cookies (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string, or `memory` for the
///   in-process store (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `RUN_MIGRATIONS`: apply migrations on startup (default: true)
/// - `JWT_SECRET`: token signing secret, at least 32 characters (required)
/// - `JWT_EXPIRATION_HOURS`: session lifetime (default: 24)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME`: when the first two are
///   set, that account is created or promoted to ADMIN on startup
/// - `RUST_LOG` / `LOG_FORMAT`: read by the binary when installing tracing
///
/// # Example
///
/// ```no_run
/// use tasklog_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// `DATABASE_URL` value selecting the in-process store
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Administrator ensured on startup
    pub admin: Option<AdminBootstrap>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode: HSTS header and `Secure` session cookie
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for token signing
    ///
    /// Must be kept secret and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Session lifetime in hours
    pub expiration_hours: i64,
}

impl JwtConfig {
    pub fn expiration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expiration_hours)
    }
}

/// Administrator account guaranteed to exist after startup
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("Invalid boolean value: {}", other),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Longest accepted session lifetime: one year
pub const MAX_JWT_EXPIRATION_HOURS: i64 = 24 * 366;

fn parse_expiration_hours(value: &str) -> anyhow::Result<i64> {
    let hours = value.trim().parse::<i64>()?;
    if hours <= 0 {
        anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
    }
    if hours > MAX_JWT_EXPIRATION_HOURS {
        anyhow::bail!(
            "JWT_EXPIRATION_HOURS must be at most {} (one year)",
            MAX_JWT_EXPIRATION_HOURS
        );
    }
    Ok(hours)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or the JWT secret is shorter than 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let production = parse_bool(&env::var("PRODUCTION").unwrap_or_default())?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let run_migrations = parse_bool(&env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "true".to_string()))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expiration_hours =
            parse_expiration_hours(&env::var("JWT_EXPIRATION_HOURS").unwrap_or_else(|_| "24".to_string()))?;

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => Some(AdminBootstrap {
                email,
                password,
                name: env::var("ADMIN_NAME").ok().filter(|n| !n.trim().is_empty()),
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins: if cors_origins.is_empty() {
                    vec!["*".to_string()]
                } else {
                    cors_origins
                },
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                run_migrations,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours,
            },
            admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Configuration for tests and local runs against the in-process store
    pub fn for_memory_store(jwt_secret: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: MEMORY_DATABASE_URL.to_string(),
                max_connections: 1,
                run_migrations: false,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                expiration_hours: 24,
            },
            admin: None,
        }
    }
}
