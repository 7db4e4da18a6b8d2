//! Per-user sync settings and webhook channel state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::item::ItemCategory;

/// Which way changes are allowed to flow for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    PushOnly,
    PullOnly,
    Both,
}

impl SyncDirection {
    pub fn allows_push(&self) -> bool {
        !matches!(self, Self::PullOnly)
    }

    pub fn allows_pull(&self) -> bool {
        !matches!(self, Self::PushOnly)
    }
}

/// Per-category sync toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    pub task_deadlines: bool,
    pub team_events: bool,
    pub personal_events: bool,
}

impl CategoryToggles {
    pub fn allows(&self, category: ItemCategory) -> bool {
        match category {
            ItemCategory::TaskDeadline => self.task_deadlines,
            ItemCategory::TeamEvent => self.team_events,
            ItemCategory::PersonalEvent => self.personal_events,
        }
    }
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self { task_deadlines: true, team_events: true, personal_events: true }
    }
}

/// Push-notification subscription state.
///
/// Created by registration, renewed before expiry, cancelled on disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookChannel {
    pub channel_id: String,
    pub resource_id: String,
    pub expiration: DateTime<Utc>,
}

impl WebhookChannel {
    /// True when the channel expires within the renewal lead window
    pub fn expiring_soon(&self, lead_secs: i64, now: DateTime<Utc>) -> bool {
        self.expiration - now < Duration::seconds(lead_secs)
    }
}

/// Provider webhook payload state: handshake or a real change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    Sync,
    Exists,
    NotExists,
}

impl ResourceState {
    /// Parse the provider's resource-state header value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sync" => Some(Self::Sync),
            "exists" => Some(Self::Exists),
            "not_exists" => Some(Self::NotExists),
            _ => None,
        }
    }
}

/// One row per user: configuration, credentials, and webhook identity.
///
/// Created on first successful OAuth grant. Disconnect disables the row
/// (never deletes it) and clears tokens plus webhook identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub user_id: String,
    pub enabled: bool,
    /// Dedicated sync calendar; None until the first sync resolves it
    pub calendar_id: Option<String>,
    pub direction: SyncDirection,
    pub categories: CategoryToggles,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub channel: Option<WebhookChannel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncSettings {
    /// New settings row after a successful OAuth grant
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            enabled: true,
            calendar_id: None,
            direction: SyncDirection::Both,
            categories: CategoryToggles::default(),
            last_synced_at: None,
            access_token: None,
            refresh_token: None,
            token_expiry: None,
            channel: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the cached access token is missing, expired, or expires
    /// within `threshold_secs`
    pub fn token_needs_refresh(&self, threshold_secs: i64, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.token_expiry) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => expiry - now < Duration::seconds(threshold_secs),
        }
    }
}
