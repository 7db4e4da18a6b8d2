//! Configuration loader
//!
//! Loads the sync runtime configuration from environment variables, with an
//! optional `.env` file picked up first via `dotenvy`.
//!
//! ## Environment Variables
//! - `TEAMLINE_DB_PATH`: SQLite database file path
//! - `TEAMLINE_DB_POOL_SIZE`: connection pool size (default 5)
//! - `GOOGLE_CALENDAR_CLIENT_ID`: OAuth client id for token refresh
//! - `GOOGLE_CALENDAR_CLIENT_SECRET`: OAuth client secret
//! - `TEAMLINE_WEBHOOK_URL`: public HTTPS URL the provider delivers
//!   notifications to
//! - `TEAMLINE_WEBHOOK_BIND`: local bind address for the receiving endpoint
//!   (default `0.0.0.0:8391`)
//! - `TEAMLINE_SYNC_CRON`: cron expression for the periodic sync job
//!   (default every 15 minutes)

use teamline_domain::{Result, TeamlineError};

const DEFAULT_POOL_SIZE: u32 = 5;
const DEFAULT_WEBHOOK_BIND: &str = "0.0.0.0:8391";
const DEFAULT_SYNC_CRON: &str = "0 */15 * * * *";

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// OAuth client credentials for the calendar provider
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Webhook receiving endpoint settings
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public URL registered with the provider; must be HTTPS
    pub public_url: String,
    pub bind_addr: String,
}

/// Full infrastructure configuration
#[derive(Debug, Clone)]
pub struct InfraConfig {
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub webhook: WebhookConfig,
    /// Cron expression driving the periodic sync job
    pub sync_cron: String,
}

impl InfraConfig {
    /// Load configuration, reading a `.env` file first when present.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_env()
    }

    /// Load configuration from environment variables only.
    ///
    /// # Errors
    /// Returns [`TeamlineError::Config`] when a required variable is missing
    /// or has an invalid value.
    pub fn from_env() -> Result<Self> {
        let database = DatabaseConfig {
            path: env_var("TEAMLINE_DB_PATH")?,
            pool_size: env_var_or("TEAMLINE_DB_POOL_SIZE", &DEFAULT_POOL_SIZE.to_string())
                .parse::<u32>()
                .map_err(|e| TeamlineError::Config(format!("invalid pool size: {e}")))?,
        };

        let google = GoogleConfig {
            client_id: env_var("GOOGLE_CALENDAR_CLIENT_ID")?,
            client_secret: env_var("GOOGLE_CALENDAR_CLIENT_SECRET")?,
        };

        let public_url = env_var("TEAMLINE_WEBHOOK_URL")?;
        let parsed = url::Url::parse(&public_url)
            .map_err(|e| TeamlineError::Config(format!("invalid TEAMLINE_WEBHOOK_URL: {e}")))?;
        if parsed.scheme() != "https" {
            return Err(TeamlineError::Config(
                "TEAMLINE_WEBHOOK_URL must be an https:// URL".into(),
            ));
        }

        let webhook = WebhookConfig {
            public_url,
            bind_addr: env_var_or("TEAMLINE_WEBHOOK_BIND", DEFAULT_WEBHOOK_BIND),
        };

        let sync_cron = env_var_or("TEAMLINE_SYNC_CRON", DEFAULT_SYNC_CRON);

        Ok(Self { database, google, webhook, sync_cron })
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| TeamlineError::Config(format!("missing environment variable: {name}")))
}

fn env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
