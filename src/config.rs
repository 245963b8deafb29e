use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub planner: PlannerConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
    pub email_retry: EmailRetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Whether the periodic planner sync worker is enabled.
    pub enabled: bool,
    /// Feed endpoint of the external calendar/automation service.
    /// When unset, sync is skipped (manual activities only).
    pub feed_url: Option<String>,
    /// Optional bearer token sent with feed requests.
    pub api_key: Option<String>,
    /// Seconds between periodic sync cycles.
    pub sync_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Endpoint of the mail-dispatch function. When unset, notifications are
    /// in-app only and the email queue is not fed.
    pub webhook_url: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the sync endpoints (e.g. /api/calendar/sync)
    pub sync_per_second: u32,
    /// Burst size for the sync endpoints
    pub sync_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRetryConfig {
    /// Whether the email retry worker is enabled.
    pub enabled: bool,
    /// Initial backoff in seconds for the first retry attempt.
    pub initial_backoff_seconds: u64,
    /// How often (seconds) the worker polls for due tasks.
    pub poll_interval_seconds: u64,
    /// Maximum number of retry attempts before moving the task to DLQ.
    pub max_attempts: u32,
    /// Maximum parallel tasks processed by the retry worker.
    pub worker_concurrency: u32,
    /// Cap for exponential backoff (seconds).
    pub max_backoff_seconds: u64,
    /// TTL (seconds) for queued emails; stale assignment mails are not worth sending.
    pub default_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL (seconds) for cached list views. Invalidation on write is the
    /// primary mechanism; the TTL only bounds staleness across processes.
    pub view_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/app.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            planner: PlannerConfig {
                enabled: match env::var("PLANNER_SYNC_ENABLED") {
                    Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
                    Err(_) => true,
                },
                feed_url: env::var("PLANNER_FEED_URL").ok(),
                api_key: env::var("PLANNER_API_KEY").ok(),
                sync_interval_seconds: env::var("PLANNER_SYNC_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .unwrap_or(900u64),
            },
            mail: MailConfig {
                webhook_url: env::var("MAIL_WEBHOOK_URL").ok(),
                sender: env::var("MAIL_SENDER")
                    .unwrap_or_else(|_| "planning@gamecenter.local".to_string()),
            },
            rate_limit: RateLimitConfig {
                sync_per_second: env::var("RATE_LIMIT_SYNC_PER_SECOND")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
                sync_burst: env::var("RATE_LIMIT_SYNC_BURST")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            email_retry: EmailRetryConfig {
                enabled: match env::var("EMAIL_RETRY_ENABLED") {
                    Ok(v) => match v.to_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => true,
                    },
                    Err(_) => true,
                },
                initial_backoff_seconds: env::var("EMAIL_RETRY_INITIAL_BACKOFF_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30u64),
                poll_interval_seconds: env::var("EMAIL_RETRY_POLL_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5u64),
                max_attempts: env::var("EMAIL_RETRY_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5u32),
                worker_concurrency: env::var("EMAIL_RETRY_WORKER_CONCURRENCY")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10u32),
                max_backoff_seconds: env::var("EMAIL_RETRY_MAX_BACKOFF_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600u64),
                default_ttl_seconds: env::var("EMAIL_TTL_DEFAULT_SECONDS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400u64),
            },
            cache: CacheConfig {
                view_ttl_seconds: env::var("VIEW_CACHE_TTL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60u64),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/app.db".to_string(),
                max_connections: 5,
            },
            planner: PlannerConfig {
                enabled: true,
                feed_url: None,
                api_key: None,
                sync_interval_seconds: 900,
            },
            mail: MailConfig {
                webhook_url: None,
                sender: "planning@gamecenter.local".to_string(),
            },
            rate_limit: RateLimitConfig {
                sync_per_second: 2,
                sync_burst: 5,
            },
            email_retry: EmailRetryConfig {
                enabled: true,
                initial_backoff_seconds: 30,
                poll_interval_seconds: 5,
                max_attempts: 5,
                worker_concurrency: 10,
                max_backoff_seconds: 3600,
                default_ttl_seconds: 86400,
            },
            cache: CacheConfig {
                view_ttl_seconds: 60,
            },
        }
    }
}
