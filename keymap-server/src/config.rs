//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables, falling back to
//! defaults suitable for local development.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Public prefix under which lookup keys are exposed to the outside world.
pub const DEFAULT_WEBHOOK_ENTRY_URL: &str = "https://code.flows.network/webhook";

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// PostgreSQL connection URL
    pub database_url: String,

    /// Upper bound of the shared connection pool
    pub database_max_connections: u32,

    /// Connections kept warm in the pool
    pub database_min_connections: u32,

    /// How long a request may wait for a pooled connection, in milliseconds
    pub database_acquire_timeout_ms: u64,

    /// Whether embedded migrations run at startup
    pub run_migrations: bool,

    /// Prefix of the opaque webhook URL handed back to flows
    pub webhook_entry_url: String,

    // =========================================================================
    // Slack OAuth
    // =========================================================================

    /// Slack app client id
    pub slack_client_id: Option<String>,

    /// Slack app client secret
    pub slack_client_secret: Option<String>,

    /// Redirect URI registered with the Slack app
    pub slack_redirect_uri: Option<String>,

    /// Slack Web API base URL
    pub slack_api_base: String,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/webhook_keymap".to_string()),

            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),

            database_min_connections: parse_or("DATABASE_MIN_CONNECTIONS", 1),

            database_acquire_timeout_ms: parse_or("DATABASE_ACQUIRE_TIMEOUT_MS", 5000),

            run_migrations: parse_bool("RUN_MIGRATIONS", true),

            webhook_entry_url: env::var("WEBHOOK_ENTRY_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_WEBHOOK_ENTRY_URL.to_string()),

            slack_client_id: non_empty("SLACK_CLIENT_ID"),

            slack_client_secret: non_empty("SLACK_CLIENT_SECRET"),

            slack_redirect_uri: non_empty("SLACK_REDIRECT_URI"),

            slack_api_base: env::var("SLACK_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),
        }
    }

    /// Pool acquire timeout as a [`Duration`].
    pub fn database_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.database_acquire_timeout_ms)
    }

    /// Outbound HTTP timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Slack OAuth is enabled only when both client credentials are present.
    pub fn slack_enabled(&self) -> bool {
        self.slack_client_id.is_some() && self.slack_client_secret.is_some()
    }
}

/// Parse a numeric environment variable, warning and falling back on garbage.
fn parse_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag such as "true", "0" or "no".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

/// Read an environment variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
