use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;
use crate::types::NotificationType;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Intake server bind host (default: 0.0.0.0)
    pub server_host: String,

    /// Intake server bind port (default: 8000)
    pub server_port: u16,

    /// Grace period for in-flight requests on shutdown, in seconds (default: 20)
    pub server_shutdown_timeout_secs: u64,

    /// Delivery attempts per notification within one cycle (default: 3)
    pub retry_max_attempts: u32,

    /// Delay between delivery attempts in milliseconds (default: 5000)
    pub retry_delay_ms: u64,

    /// Delivery loop polling interval in milliseconds (default: 10000)
    pub worker_poll_interval_ms: u64,

    /// Maximum rows claimed per delivery cycle (default: 100)
    pub worker_batch_size: i64,

    /// Consecutive failed cycles tolerated before the worker gives up (default: 30, 0 = never)
    pub worker_max_consecutive_failures: u32,

    /// Channels the worker process delivers for (default: sms,chat,email)
    pub worker_channels: Vec<NotificationType>,

    /// Slack incoming webhook URL for chat notifications
    pub slack_webhook_url: Option<String>,

    /// Twilio account SID
    pub twilio_account_sid: Option<String>,

    /// Twilio auth token
    pub twilio_auth_token: Option<String>,

    /// Twilio sender number in E.164 form
    pub twilio_from_number: Option<String>,

    /// Twilio REST API base URL
    pub twilio_api_base: String,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Resend REST API base URL
    pub resend_api_base: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20")?,
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", "8000")?,
            server_shutdown_timeout_secs: parse_var("SERVER_SHUTDOWN_TIMEOUT_SECS", "20")?,
            retry_max_attempts: parse_var("RETRY_MAX_ATTEMPTS", "3")?,
            retry_delay_ms: parse_var("RETRY_DELAY_MS", "5000")?,
            worker_poll_interval_ms: parse_var("WORKER_POLL_INTERVAL_MS", "10000")?,
            worker_batch_size: parse_var("WORKER_BATCH_SIZE", "100")?,
            worker_max_consecutive_failures: parse_var("WORKER_MAX_CONSECUTIVE_FAILURES", "30")?,
            worker_channels: parse_channels(
                &std::env::var("WORKER_CHANNELS").unwrap_or_else(|_| "sms,chat,email".to_string()),
            )?,
            slack_webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_from_number: std::env::var("TWILIO_FROM_NUMBER").ok(),
            twilio_api_base: std::env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            resend_api_base: std::env::var("RESEND_API_BASE")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
        })
    }

    /// `host:port` the intake server binds to.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server_shutdown_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }

    /// Retry policy applied to each channel call made by the delivery worker.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> anyhow::Result<T> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                name,
                std::any::type_name::<T>()
            )
        })
}

/// Parse a comma-separated channel list such as `sms,chat`.
pub fn parse_channels(raw: &str) -> anyhow::Result<Vec<NotificationType>> {
    let mut channels = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let kind = NotificationType::from_str(part)
            .map_err(|_| anyhow::anyhow!("WORKER_CHANNELS contains unknown channel '{}'", part))?;
        if !channels.contains(&kind) {
            channels.push(kind);
        }
    }

    if channels.is_empty() {
        anyhow::bail!("WORKER_CHANNELS must name at least one channel");
    }

    Ok(channels)
}
