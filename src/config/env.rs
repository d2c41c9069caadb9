//! Environment variable configuration

use std::env;
use std::sync::{LazyLock, Once};

static INIT: Once = Once::new();

/// Initializes the environment by loading the .env file.
fn init_env() {
    INIT.call_once(|| {
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Warning: .env file not found or error loading: {e}");
        }
    });
}

/// Retrieves an environment variable by key.
///
/// If the variable is not set, returns the provided default value.
/// If no default is provided and the variable is not set, returns an empty string.
#[must_use]
pub fn get_env(key: &str, default: Option<&str>) -> String {
    init_env();
    env::var(key).unwrap_or_else(|_| default.unwrap_or("").to_string())
}

/// Retrieves an environment variable as a parsed type.
#[must_use]
pub fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    init_env();
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server settings
    pub server_port: String,

    // Auth settings
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,

    // AWS settings (reminder mail transport)
    pub aws_region: String,
    pub mail_from_address: String,

    // Database settings
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,

    // Background subsystem settings
    pub reminder_queue_capacity: usize,
    pub log_queue_capacity: usize,
    pub archive_interval_secs: u64,
    pub shutdown_grace_secs: u64,

    // Sentry settings
    pub sentry_dsn: String,
    pub sentry_traces_sample_rate: f32,
}

impl AppConfig {
    /// Creates a new `AppConfig` from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server_port: get_env("SERVER_PORT", Some("8080")),

            jwt_secret: get_env(
                "JWT_SECRET",
                if cfg!(test) {
                    Some("test-jwt-secret-0123456789")
                } else {
                    None
                },
            ),
            jwt_ttl_hours: get_env_parsed("JWT_TTL_HOURS", 24),

            aws_region: get_env("AWS_REGION", Some("eu-central-1")),
            mail_from_address: get_env("MAIL_FROM_ADDRESS", None),

            db_max_connections: get_env_parsed("DB_MAX_CONNECTIONS", 20),
            db_min_connections: get_env_parsed("DB_MIN_CONNECTIONS", 5),
            db_acquire_timeout_secs: get_env_parsed("DB_ACQUIRE_TIMEOUT_SECS", 30),
            db_idle_timeout_secs: get_env_parsed("DB_IDLE_TIMEOUT_SECS", 300),

            reminder_queue_capacity: get_env_parsed("REMINDER_QUEUE_CAPACITY", 100),
            log_queue_capacity: get_env_parsed("LOG_QUEUE_CAPACITY", 100),
            archive_interval_secs: get_env_parsed("ARCHIVE_INTERVAL_SECS", 3600),
            shutdown_grace_secs: get_env_parsed("SHUTDOWN_GRACE_SECS", 10),

            sentry_dsn: get_env("SENTRY_DSN", None),
            sentry_traces_sample_rate: get_env_parsed("SENTRY_TRACES_SAMPLE_RATE", 0.1),
        }
    }
}

/// Global application configuration instance.
pub static APP_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::from_env);
