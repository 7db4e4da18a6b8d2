//! In-memory mock repositories and a recording notifier.
//!
//! Deterministic stand-ins for the persistence ports, enabling engine tests
//! without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teamline_core::sync::ports::{ChangeNotifier, ItemRepository, SettingsRepository};
use teamline_domain::{
    ExternalRef, Result as DomainResult, SyncItem, SyncSettings, TeamlineError, WebhookChannel,
};

/// In-memory mock for `SettingsRepository`.
#[derive(Default, Clone)]
pub struct MockSettingsRepository {
    rows: Arc<Mutex<HashMap<String, SyncSettings>>>,
}

impl MockSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(self, settings: SyncSettings) -> Self {
        self.rows.lock().unwrap().insert(settings.user_id.clone(), settings);
        self
    }

    pub fn settings_of(&self, user_id: &str) -> Option<SyncSettings> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl SettingsRepository for MockSettingsRepository {
    async fn get(&self, user_id: &str) -> DomainResult<Option<SyncSettings>> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert(&self, settings: &SyncSettings) -> DomainResult<()> {
        self.rows.lock().unwrap().insert(settings.user_id.clone(), settings.clone());
        Ok(())
    }

    async fn list_enabled_user_ids(&self) -> DomainResult<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.enabled)
            .map(|s| s.user_id.clone())
            .collect())
    }

    async fn find_user_by_channel(&self, channel_id: &str) -> DomainResult<Option<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.channel.as_ref().is_some_and(|c| c.channel_id == channel_id))
            .map(|s| s.user_id.clone()))
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.mutate(user_id, |s| {
            s.access_token = Some(access_token.to_string());
            s.token_expiry = Some(expiry);
        })
    }

    async fn update_calendar_id(&self, user_id: &str, calendar_id: &str) -> DomainResult<()> {
        self.mutate(user_id, |s| s.calendar_id = Some(calendar_id.to_string()))
    }

    async fn update_last_synced(&self, user_id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        self.mutate(user_id, |s| s.last_synced_at = Some(at))
    }

    async fn update_channel(&self, user_id: &str, channel: &WebhookChannel) -> DomainResult<()> {
        self.mutate(user_id, |s| s.channel = Some(channel.clone()))
    }

    async fn clear_channel(&self, user_id: &str) -> DomainResult<()> {
        self.mutate(user_id, |s| s.channel = None)
    }

    async fn disconnect(&self, user_id: &str) -> DomainResult<()> {
        self.mutate(user_id, |s| {
            s.enabled = false;
            s.access_token = None;
            s.refresh_token = None;
            s.token_expiry = None;
            s.channel = None;
        })
    }
}

impl MockSettingsRepository {
    fn mutate(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut SyncSettings),
    ) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let settings = rows
            .get_mut(user_id)
            .ok_or_else(|| TeamlineError::NotFound(format!("no settings for {user_id}")))?;
        apply(settings);
        settings.updated_at = Utc::now();
        Ok(())
    }
}

/// In-memory mock for `ItemRepository`.
#[derive(Default, Clone)]
pub struct MockItemRepository {
    items: Arc<Mutex<Vec<SyncItem>>>,
}

impl MockItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, item: SyncItem) -> Self {
        self.items.lock().unwrap().push(item);
        self
    }

    pub fn all(&self) -> Vec<SyncItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn by_id(&self, item_id: &str) -> Option<SyncItem> {
        self.items.lock().unwrap().iter().find(|i| i.id == item_id).cloned()
    }

    /// Remove an item outright, simulating an internal deletion that leaves
    /// the mirrored provider event orphaned.
    pub fn remove(&self, item_id: &str) {
        self.items.lock().unwrap().retain(|i| i.id != item_id);
    }
}

#[async_trait]
impl ItemRepository for MockItemRepository {
    async fn list_dirty(&self, user_id: &str) -> DomainResult<Vec<SyncItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && !i.is_in_sync())
            .cloned()
            .collect())
    }

    async fn find_by_external_ref(
        &self,
        user_id: &str,
        external_ref: &ExternalRef,
    ) -> DomainResult<Option<SyncItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.user_id == user_id && i.external_ref.as_ref() == Some(external_ref))
            .cloned())
    }

    async fn list_mapped_event_ids(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> DomainResult<Vec<String>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .filter_map(|i| i.external_ref.as_ref())
            .filter(|ext| ext.calendar_id == calendar_id)
            .map(|ext| ext.event_id.clone())
            .collect())
    }

    async fn set_mapping(
        &self,
        item_id: &str,
        external_ref: &ExternalRef,
        synced_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| TeamlineError::NotFound(format!("no item {item_id}")))?;
        item.external_ref = Some(external_ref.clone());
        item.synced_at = Some(synced_at);
        Ok(())
    }

    async fn mark_synced(&self, item_id: &str, synced_at: DateTime<Utc>) -> DomainResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| TeamlineError::NotFound(format!("no item {item_id}")))?;
        item.synced_at = Some(synced_at);
        Ok(())
    }

    async fn insert(&self, item: &SyncItem) -> DomainResult<()> {
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }

    async fn update_content(&self, item: &SyncItem) -> DomainResult<()> {
        let mut items = self.items.lock().unwrap();
        let existing = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| TeamlineError::NotFound(format!("no item {}", item.id)))?;
        *existing = item.clone();
        Ok(())
    }
}

/// Notifier that records every emission for assertions.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    emitted: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_for(&self, user_id: &str) -> Vec<String> {
        self.emitted
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _, _)| user == user_id)
            .map(|(_, event, _)| event.clone())
            .collect()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn emit_to_user(&self, user_id: &str, event: &str, payload: serde_json::Value) {
        self.emitted.lock().unwrap().push((user_id.to_string(), event.to_string(), payload));
    }
}
