//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Teamline
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TeamlineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Sync invoked for a user with no enabled settings. Caller-visible,
    /// never retried.
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Refresh token rejected or expired by the provider. Sync for the user
    /// halts until re-authorization.
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An item produced an interval with `end < start`. Permanent for that
    /// item until the source record is corrected.
    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    /// Malformed item or event data that could not be translated.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A push-notification channel could not be created. Sync continues in
    /// pull-on-demand mode.
    #[error("Webhook registration failed: {0}")]
    WebhookRegistration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Teamline operations
pub type Result<T> = std::result::Result<T, TeamlineError>;
