//! Port interfaces for sync persistence and client notification
//!
//! These traits define the boundaries between the sync engine and
//! infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teamline_domain::{ExternalRef, Result, SyncItem, SyncSettings, WebhookChannel};

/// Trait for persisting per-user sync settings
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch the settings row for a user, if one exists
    async fn get(&self, user_id: &str) -> Result<Option<SyncSettings>>;

    /// Insert or replace a settings row
    async fn upsert(&self, settings: &SyncSettings) -> Result<()>;

    /// All users with sync currently enabled
    async fn list_enabled_user_ids(&self) -> Result<Vec<String>>;

    /// Resolve an inbound webhook channel id to its owner
    async fn find_user_by_channel(&self, channel_id: &str) -> Result<Option<String>>;

    /// Persist a refreshed access token and its expiry
    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<()>;

    /// Persist the resolved dedicated calendar id
    async fn update_calendar_id(&self, user_id: &str, calendar_id: &str) -> Result<()>;

    /// Record the completion time of a sync batch
    async fn update_last_synced(&self, user_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Persist a newly registered webhook channel
    async fn update_channel(&self, user_id: &str, channel: &WebhookChannel) -> Result<()>;

    /// Clear the persisted webhook channel fields
    async fn clear_channel(&self, user_id: &str) -> Result<()>;

    /// User-initiated disconnect: disable the row (never delete it) and
    /// clear tokens plus webhook identifiers
    async fn disconnect(&self, user_id: &str) -> Result<()>;
}

/// Trait for reading and updating syncable items (tasks and events)
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Items needing a push: `synced_at IS NULL OR updated_at > synced_at`
    async fn list_dirty(&self, user_id: &str) -> Result<Vec<SyncItem>>;

    /// Look up an item by its provider event mapping
    async fn find_by_external_ref(
        &self,
        user_id: &str,
        external_ref: &ExternalRef,
    ) -> Result<Option<SyncItem>>;

    /// External event ids of all items holding a mapping into the calendar
    async fn list_mapped_event_ids(&self, user_id: &str, calendar_id: &str)
        -> Result<Vec<String>>;

    /// Store a newly created provider mapping and the sync timestamp
    async fn set_mapping(
        &self,
        item_id: &str,
        external_ref: &ExternalRef,
        synced_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Refresh the sync timestamp after a successful update push
    async fn mark_synced(&self, item_id: &str, synced_at: DateTime<Utc>) -> Result<()>;

    /// Insert an item created from a pulled provider event
    async fn insert(&self, item: &SyncItem) -> Result<()>;

    /// Overwrite an item's content fields from a pulled provider event
    async fn update_content(&self, item: &SyncItem) -> Result<()>;
}

/// Narrow emit interface to the real-time client transport.
///
/// Injected rather than reached through a process-global handle; failures in
/// here must never affect sync state, so emission is fire-and-forget.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn emit_to_user(&self, user_id: &str, event: &str, payload: serde_json::Value);
}

/// Notifier that drops every emission. Absence of a transport is a no-op,
/// never an error.
pub struct NoopNotifier;

#[async_trait]
impl ChangeNotifier for NoopNotifier {
    async fn emit_to_user(&self, _user_id: &str, _event: &str, _payload: serde_json::Value) {}
}
