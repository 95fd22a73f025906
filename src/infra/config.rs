use std::net::SocketAddr;

use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::infra::webhook_signature::DEFAULT_TOLERANCE_SECS;

pub struct AppConfig {
    /// Signing secret for inbound processor webhooks. Requests are rejected while unset.
    pub stripe_webhook_secret: Option<SecretString>,
    /// Allowed skew between the signature timestamp and our clock. Zero disables the check.
    pub webhook_tolerance: chrono::Duration,
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Must stay well under the processor's retry window so a slow store
    /// surfaces as a retryable failure rather than a lost event.
    pub request_timeout: std::time::Duration,
    /// How long processed event ids are remembered for deduplication.
    pub processed_event_retention: chrono::Duration,
    pub sweep_interval: std::time::Duration,
    /// JSON log file. `None` logs to the console only.
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let stripe_webhook_secret: Option<SecretString> = std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.into()));

        let webhook_tolerance_secs: i64 =
            get_env_default("WEBHOOK_TOLERANCE_SECS", DEFAULT_TOLERANCE_SECS);
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let request_timeout_secs: u64 = get_env_default("REQUEST_TIMEOUT_SECS", 10);
        let retention_hours: i64 = get_env_default("PROCESSED_EVENT_RETENTION_HOURS", 72);
        let sweep_interval_secs: u64 = get_env_default("SWEEP_INTERVAL_SECS", 3600);
        let log_file: Option<String> = match std::env::var("LOG_FILE") {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(path),
            Err(_) => Some("app.log".to_string()),
        };

        Self {
            stripe_webhook_secret,
            webhook_tolerance: chrono::Duration::seconds(webhook_tolerance_secs),
            database_url,
            database_max_connections,
            bind_addr,
            request_timeout: std::time::Duration::from_secs(request_timeout_secs),
            processed_event_retention: chrono::Duration::hours(retention_hours),
            sweep_interval: std::time::Duration::from_secs(sweep_interval_secs),
            log_file,
        }
    }
}
