//! Webhook channel manager
//!
//! Owns the provider push-notification subscription for each user:
//! Unregistered → Active → (Renewing) → Active → Cancelled. Channels are
//! renewed proactively inside a fixed lead window and cancelled explicitly
//! on disconnect so no provider-side subscription is left orphaned.
//!
//! Inbound deliveries resolve the channel id back to a user; a `sync`
//! resource-state is handshake verification only, while `exists` /
//! `not_exists` trigger a wide-window pull. Downstream failures are logged
//! and swallowed — the receiving endpoint must always answer success or the
//! provider disables the subscription.

use std::sync::Arc;

use serde_json::json;
use teamline_domain::constants::{
    CHANNEL_RENEWAL_LEAD_SECS, CHANNEL_TTL_SECS, EVENT_CALENDAR_UPDATED,
};
use teamline_domain::{ResourceState, Result, TeamlineError, WebhookChannel};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::sync::engine::{PullWindow, SyncEngine};
use crate::sync::ports::{ChangeNotifier, SettingsRepository};

/// Manages webhook channel registration, renewal, cancellation, and inbound
/// notification handling
pub struct ChannelManager {
    settings: Arc<dyn SettingsRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    engine: Arc<SyncEngine>,
    webhook_url: String,
    renewal_lead_secs: i64,
}

impl ChannelManager {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        engine: Arc<SyncEngine>,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            notifier,
            engine,
            webhook_url: webhook_url.into(),
            renewal_lead_secs: CHANNEL_RENEWAL_LEAD_SECS,
        }
    }

    /// Override the renewal lead window (primarily for tests)
    pub fn with_renewal_lead(mut self, renewal_lead_secs: i64) -> Self {
        self.renewal_lead_secs = renewal_lead_secs;
        self
    }

    /// Register a fresh channel for the user's dedicated calendar.
    ///
    /// An existing channel is cancelled first, best-effort: a failed cancel
    /// never blocks re-registration.
    #[instrument(skip(self), fields(user_id))]
    pub async fn register(&self, user_id: &str) -> Result<WebhookChannel> {
        let tokens = self.engine.token_manager();
        let settings = tokens.require_enabled(user_id).await?;
        let token = tokens.ensure_valid_token(user_id).await?;

        if let Some(channel) = &settings.channel {
            if let Err(e) = self
                .engine
                .calendar()
                .unsubscribe(&token, &channel.channel_id, &channel.resource_id)
                .await
            {
                warn!(user_id, channel_id = %channel.channel_id, error = %e,
                    "failed to cancel previous channel, continuing");
            }
        }

        let calendar_id = self.engine.resolve_calendar(user_id, &settings, &token).await?;
        let channel_id = Uuid::new_v4().to_string();

        let channel = self
            .engine
            .calendar()
            .subscribe(&token, &calendar_id, &channel_id, &self.webhook_url, CHANNEL_TTL_SECS)
            .await
            .map_err(|e| TeamlineError::WebhookRegistration(e.to_string()))?;

        self.settings.update_channel(user_id, &channel).await?;

        info!(user_id, channel_id = %channel.channel_id,
            expiration = %channel.expiration, "registered webhook channel");

        Ok(channel)
    }

    /// Re-register the channel when it expires within the lead window.
    ///
    /// Returns the new channel when a renewal happened, None otherwise.
    #[instrument(skip(self), fields(user_id))]
    pub async fn check_and_renew(&self, user_id: &str) -> Result<Option<WebhookChannel>> {
        let settings = self
            .settings
            .get(user_id)
            .await?
            .ok_or_else(|| TeamlineError::Auth(format!("no sync settings for user {user_id}")))?;

        let Some(channel) = &settings.channel else {
            return Ok(None);
        };

        if !channel.expiring_soon(self.renewal_lead_secs, chrono::Utc::now()) {
            return Ok(None);
        }

        debug!(user_id, channel_id = %channel.channel_id, "channel expiring soon, renewing");
        self.register(user_id).await.map(Some)
    }

    /// Cancel the user's channel and clear the persisted identifiers.
    ///
    /// An unsubscribe failure (typically "already gone") is logged; the
    /// persisted fields are cleared regardless.
    #[instrument(skip(self), fields(user_id))]
    pub async fn cancel(&self, user_id: &str) -> Result<()> {
        let settings = self
            .settings
            .get(user_id)
            .await?
            .ok_or_else(|| TeamlineError::Auth(format!("no sync settings for user {user_id}")))?;

        if let Some(channel) = &settings.channel {
            match self.engine.token_manager().ensure_valid_token(user_id).await {
                Ok(token) => {
                    if let Err(e) = self
                        .engine
                        .calendar()
                        .unsubscribe(&token, &channel.channel_id, &channel.resource_id)
                        .await
                    {
                        warn!(user_id, channel_id = %channel.channel_id, error = %e,
                            "unsubscribe failed, clearing channel anyway");
                    }
                }
                Err(e) => {
                    warn!(user_id, error = %e, "no valid token for unsubscribe, clearing channel");
                }
            }
        }

        self.settings.clear_channel(user_id).await?;
        info!(user_id, "webhook channel cancelled");

        Ok(())
    }

    /// User-initiated disconnect: cancel the channel, then disable the
    /// settings row and clear tokens plus webhook identifiers.
    #[instrument(skip(self), fields(user_id))]
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        if let Err(e) = self.cancel(user_id).await {
            warn!(user_id, error = %e, "channel cancel failed during disconnect");
        }
        self.settings.disconnect(user_id).await?;
        info!(user_id, "sync disconnected");
        Ok(())
    }

    /// Handle one inbound webhook delivery.
    ///
    /// Never returns an error: the HTTP endpoint answers success to the
    /// provider regardless of downstream outcome.
    #[instrument(skip(self))]
    pub async fn handle_notification(&self, channel_id: &str, resource_state: ResourceState) {
        let user_id = match self.settings.find_user_by_channel(channel_id).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                warn!(channel_id, "notification for unknown channel, dropping");
                return;
            }
            Err(e) => {
                error!(channel_id, error = %e, "failed to resolve channel owner");
                return;
            }
        };

        match resource_state {
            ResourceState::Sync => {
                // Handshake verification only; no resync, zero provider calls
                debug!(channel_id, user_id, "channel handshake acknowledged");
            }
            ResourceState::Exists | ResourceState::NotExists => {
                match self.engine.pull_provider_changes(&user_id, PullWindow::default()).await {
                    Ok(report) => {
                        self.notifier
                            .emit_to_user(
                                &user_id,
                                EVENT_CALENDAR_UPDATED,
                                json!({
                                    "created": report.created,
                                    "updated": report.updated,
                                    "failed": report.failed,
                                }),
                            )
                            .await;
                    }
                    Err(e) => {
                        // Logged, never propagated: the delivery still
                        // succeeds from the provider's point of view
                        error!(channel_id, user_id, error = %e, "webhook-triggered pull failed");
                    }
                }
            }
        }
    }
}
