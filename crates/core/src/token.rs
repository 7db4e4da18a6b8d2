//! Token manager
//!
//! Guarantees a valid access token before any provider call. Expiry is always
//! checked against the persisted `token_expiry`; a cached token is never
//! assumed valid. Refreshing twice concurrently is tolerated: both refreshes
//! produce a currently valid token and the write is last-writer-wins safe.

use std::sync::Arc;

use chrono::{Duration, Utc};
use teamline_domain::constants::TOKEN_REFRESH_THRESHOLD_SECS;
use teamline_domain::{Result, SyncSettings, TeamlineError};
use tracing::{debug, info, instrument};

use crate::calendar_ports::CalendarPort;
use crate::sync::ports::SettingsRepository;

/// Ensures a valid access token is available for a user
pub struct TokenManager {
    settings: Arc<dyn SettingsRepository>,
    calendar: Arc<dyn CalendarPort>,
    refresh_threshold_secs: i64,
}

impl TokenManager {
    pub fn new(settings: Arc<dyn SettingsRepository>, calendar: Arc<dyn CalendarPort>) -> Self {
        Self { settings, calendar, refresh_threshold_secs: TOKEN_REFRESH_THRESHOLD_SECS }
    }

    /// Override the refresh threshold (primarily for tests)
    pub fn with_threshold(mut self, refresh_threshold_secs: i64) -> Self {
        self.refresh_threshold_secs = refresh_threshold_secs;
        self
    }

    /// Return a currently valid access token for the user, refreshing it
    /// first when expired or near expiry.
    ///
    /// # Errors
    /// - [`TeamlineError::Auth`] when no settings row exists or sync is
    ///   disabled — the caller must not touch the provider at all.
    /// - [`TeamlineError::TokenRefresh`] when the provider rejects the
    ///   refresh; sync for this user halts until re-authorization.
    #[instrument(skip(self), fields(user_id))]
    pub async fn ensure_valid_token(&self, user_id: &str) -> Result<String> {
        let settings = self.require_enabled(user_id).await?;

        let now = Utc::now();
        if !settings.token_needs_refresh(self.refresh_threshold_secs, now) {
            debug!(user_id, "access token still valid");
            return settings
                .access_token
                .ok_or_else(|| TeamlineError::Auth("settings row holds no access token".into()));
        }

        let refresh_token = settings.refresh_token.ok_or_else(|| {
            TeamlineError::TokenRefresh("no refresh token stored for user".into())
        })?;

        let refreshed = self
            .calendar
            .refresh_access_token(&refresh_token)
            .await
            .map_err(|e| TeamlineError::TokenRefresh(e.to_string()))?;

        let expiry = Utc::now() + Duration::seconds(refreshed.expires_in);
        self.settings.update_tokens(user_id, &refreshed.access_token, expiry).await?;

        info!(user_id, "refreshed access token");

        Ok(refreshed.access_token)
    }

    /// Load the settings row, failing with `Auth` when it is absent or
    /// disabled
    pub(crate) async fn require_enabled(&self, user_id: &str) -> Result<SyncSettings> {
        let settings = self
            .settings
            .get(user_id)
            .await?
            .ok_or_else(|| TeamlineError::Auth(format!("no sync settings for user {user_id}")))?;

        if !settings.enabled {
            return Err(TeamlineError::Auth(format!("sync disabled for user {user_id}")));
        }

        Ok(settings)
    }
}
