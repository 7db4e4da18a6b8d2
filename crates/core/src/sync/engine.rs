//! Sync orchestrator
//!
//! Computes what to push and pull between the internal item store and the
//! external calendar, applies create-or-update decisions, keeps the mapping
//! state current, and reconciles orphaned external events. Invoked by
//! explicit user action, the scheduler, and webhook-triggered resyncs.
//!
//! Batch semantics: a single failing item never aborts a batch; per-item
//! failures are aggregated into the returned report. Only setup-level
//! failures (missing settings, token refresh, calendar resolution) abort a
//! whole operation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use teamline_domain::constants::{
    DEDICATED_CALENDAR_NAME, DEFAULT_PULL_WINDOW_DAYS, EVENT_SYNC_COMPLETED, EVENT_SYNC_ERROR,
    EVENT_SYNC_STARTED, MAX_LIST_RESULTS, PRIMARY_CALENDAR_ID,
};
use teamline_domain::{
    CleanupReport, ExternalRef, ItemCategory, ItemKind, Participants, ProviderEvent, Result,
    SyncItem, SyncReport, SyncSettings, TeamlineError,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::calendar_ports::CalendarPort;
use crate::mapper;
use crate::sync::gate::SyncGate;
use crate::sync::ports::{ChangeNotifier, ItemRepository, SettingsRepository};
use crate::token::TokenManager;

/// Bounded time range for a pull batch.
///
/// Defaults to a generous ±1 year around now to tolerate long-lived events
/// without ever listing unbounded.
#[derive(Debug, Clone, Copy)]
pub struct PullWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl PullWindow {
    pub fn around_now(days: i64) -> Self {
        let now = Utc::now();
        Self { time_min: now - Duration::days(days), time_max: now + Duration::days(days) }
    }
}

impl Default for PullWindow {
    fn default() -> Self {
        Self::around_now(DEFAULT_PULL_WINDOW_DAYS)
    }
}

enum PushOutcome {
    Created,
    Updated,
}

/// The core sync engine
pub struct SyncEngine {
    settings: Arc<dyn SettingsRepository>,
    items: Arc<dyn ItemRepository>,
    calendar: Arc<dyn CalendarPort>,
    notifier: Arc<dyn ChangeNotifier>,
    tokens: TokenManager,
    gate: SyncGate,
}

impl SyncEngine {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        items: Arc<dyn ItemRepository>,
        calendar: Arc<dyn CalendarPort>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        let tokens = TokenManager::new(settings.clone(), calendar.clone());
        Self { settings, items, calendar, notifier, tokens, gate: SyncGate::new() }
    }

    /// Replace the token manager (tests use a tightened refresh threshold)
    pub fn with_token_manager(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn calendar(&self) -> &Arc<dyn CalendarPort> {
        &self.calendar
    }

    /// Push dirty internal items to the external calendar.
    ///
    /// Selects items where `synced_at IS NULL OR updated_at > synced_at`,
    /// filtered by the per-category toggles. Re-running with no intervening
    /// internal changes performs zero provider writes.
    #[instrument(skip(self), fields(user_id))]
    pub async fn push_user_changes(&self, user_id: &str) -> Result<SyncReport> {
        let _guard = self.gate.acquire(user_id).await;
        self.emit(user_id, EVENT_SYNC_STARTED, json!({ "op": "push" })).await;

        let result = self.push_inner(user_id).await;
        self.emit_outcome(user_id, "push", &result).await;
        result
    }

    async fn push_inner(&self, user_id: &str) -> Result<SyncReport> {
        let settings = self.tokens.require_enabled(user_id).await?;

        if !settings.direction.allows_push() {
            debug!(user_id, "push skipped: direction is pull-only");
            return Ok(SyncReport::default());
        }

        let token = self.tokens.ensure_valid_token(user_id).await?;
        let calendar_id = self.resolve_calendar(user_id, &settings, &token).await?;

        let dirty = self.items.list_dirty(user_id).await?;
        debug!(user_id, count = dirty.len(), "pushing dirty items");

        let mut report = SyncReport::default();
        for item in &dirty {
            if !settings.categories.allows(item.category) {
                report.skipped += 1;
                continue;
            }

            match self.push_item(&token, &calendar_id, item).await {
                Ok(PushOutcome::Created) => report.created += 1,
                Ok(PushOutcome::Updated) => report.updated += 1,
                Err(e) => {
                    warn!(user_id, item_id = %item.id, error = %e, "failed to push item");
                    report.record_failure(&item.id, e.to_string());
                }
            }
        }

        self.settings.update_last_synced(user_id, Utc::now()).await?;

        info!(
            user_id,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "push completed"
        );

        Ok(report)
    }

    async fn push_item(
        &self,
        token: &str,
        calendar_id: &str,
        item: &SyncItem,
    ) -> Result<PushOutcome> {
        // Mapping errors surface before any provider write
        let event = mapper::to_provider_event(item)?;
        let now = Utc::now();

        match &item.external_ref {
            None => {
                let created = self.calendar.create_event(token, calendar_id, &event).await?;
                let event_id = created.id.ok_or_else(|| {
                    TeamlineError::Mapping("provider returned a created event without id".into())
                })?;
                let external_ref =
                    ExternalRef { calendar_id: calendar_id.to_string(), event_id };
                self.items.set_mapping(&item.id, &external_ref, now).await?;
                Ok(PushOutcome::Created)
            }
            Some(external_ref) => {
                self.calendar
                    .update_event(token, &external_ref.calendar_id, &external_ref.event_id, &event)
                    .await?;
                self.items.mark_synced(&item.id, now).await?;
                Ok(PushOutcome::Updated)
            }
        }
    }

    /// Pull provider events within a bounded window into the internal store.
    ///
    /// Imports every event in the dedicated calendar regardless of
    /// provenance marker; events without an id are skipped, not failures.
    #[instrument(skip(self, window), fields(user_id))]
    pub async fn pull_provider_changes(
        &self,
        user_id: &str,
        window: PullWindow,
    ) -> Result<SyncReport> {
        let _guard = self.gate.acquire(user_id).await;
        self.emit(user_id, EVENT_SYNC_STARTED, json!({ "op": "pull" })).await;

        let result = self.pull_inner(user_id, window).await;
        self.emit_outcome(user_id, "pull", &result).await;
        result
    }

    async fn pull_inner(&self, user_id: &str, window: PullWindow) -> Result<SyncReport> {
        let settings = self.tokens.require_enabled(user_id).await?;

        if !settings.direction.allows_pull() {
            debug!(user_id, "pull skipped: direction is push-only");
            return Ok(SyncReport::default());
        }

        let token = self.tokens.ensure_valid_token(user_id).await?;
        let calendar_id = self.resolve_calendar(user_id, &settings, &token).await?;

        let events = self
            .calendar
            .list_events(&token, &calendar_id, window.time_min, window.time_max, MAX_LIST_RESULTS)
            .await?;
        debug!(user_id, count = events.len(), "pulled provider events");

        let mut report = SyncReport::default();
        for event in &events {
            let Some(event_id) = event.id.clone() else {
                report.skipped += 1;
                continue;
            };

            let external_ref =
                ExternalRef { calendar_id: calendar_id.clone(), event_id: event_id.clone() };

            match self.apply_remote_event(user_id, &external_ref, event).await {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err(e) => {
                    warn!(user_id, event_id = %event_id, error = %e, "failed to apply event");
                    report.record_failure(&event_id, e.to_string());
                }
            }
        }

        self.settings.update_last_synced(user_id, Utc::now()).await?;

        info!(
            user_id,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "pull completed"
        );

        Ok(report)
    }

    /// Apply one provider event. Returns true when a new internal item was
    /// created, false when an existing one was updated.
    async fn apply_remote_event(
        &self,
        user_id: &str,
        external_ref: &ExternalRef,
        event: &ProviderEvent,
    ) -> Result<bool> {
        let remote = mapper::from_provider_event(event)?;
        let now = Utc::now();

        match self.items.find_by_external_ref(user_id, external_ref).await? {
            Some(mut item) => {
                // Last-writer-wins: the pulled content overwrites internal
                // fields wholesale
                item.title = remote.title;
                item.description = remote.description;
                item.window = remote.window;
                item.recurrence = remote.recurrence;
                item.updated_at = now;
                item.synced_at = Some(now);
                self.items.update_content(&item).await?;
                Ok(false)
            }
            None => {
                let kind = match remote.category {
                    ItemCategory::TaskDeadline => ItemKind::Task,
                    _ => ItemKind::Event,
                };
                let item = SyncItem {
                    id: Uuid::now_v7().to_string(),
                    user_id: user_id.to_string(),
                    kind,
                    category: remote.category,
                    title: remote.title,
                    description: remote.description,
                    window: remote.window,
                    participants: Participants::default(),
                    recurrence: remote.recurrence,
                    external_ref: Some(external_ref.clone()),
                    updated_at: now,
                    synced_at: Some(now),
                };
                self.items.insert(&item).await?;
                Ok(true)
            }
        }
    }

    /// Delete external events that used to mirror an internal task whose
    /// record no longer exists.
    ///
    /// Only events carrying the task provenance marker are eligible; events
    /// whose id is still mapped by some internal item are left untouched.
    #[instrument(skip(self), fields(user_id))]
    pub async fn cleanup_orphans(&self, user_id: &str) -> Result<CleanupReport> {
        let _guard = self.gate.acquire(user_id).await;
        self.emit(user_id, EVENT_SYNC_STARTED, json!({ "op": "cleanup" })).await;

        let result = self.cleanup_inner(user_id).await;
        match &result {
            Ok(report) => {
                self.emit(
                    user_id,
                    EVENT_SYNC_COMPLETED,
                    json!({ "op": "cleanup", "deleted": report.deleted, "failed": report.failed }),
                )
                .await;
            }
            Err(e) => {
                self.emit(user_id, EVENT_SYNC_ERROR, json!({ "op": "cleanup", "error": e.to_string() }))
                    .await;
            }
        }
        result
    }

    async fn cleanup_inner(&self, user_id: &str) -> Result<CleanupReport> {
        let settings = self.tokens.require_enabled(user_id).await?;
        let token = self.tokens.ensure_valid_token(user_id).await?;
        let calendar_id = self.resolve_calendar(user_id, &settings, &token).await?;

        let window = PullWindow::default();
        let events = self
            .calendar
            .list_events(&token, &calendar_id, window.time_min, window.time_max, MAX_LIST_RESULTS)
            .await?;

        let mapped: HashSet<String> = self
            .items
            .list_mapped_event_ids(user_id, &calendar_id)
            .await?
            .into_iter()
            .collect();

        let mut report = CleanupReport::default();
        for event in &events {
            let Some(event_id) = event.id.as_deref() else { continue };

            let marked_task = event
                .summary
                .as_deref()
                .and_then(mapper::provenance_of)
                .is_some_and(|category| category == ItemCategory::TaskDeadline);
            if !marked_task || mapped.contains(event_id) {
                continue;
            }

            match self.calendar.delete_event(&token, &calendar_id, event_id).await {
                Ok(()) => {
                    debug!(user_id, event_id, "deleted orphaned event");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(user_id, event_id, error = %e, "failed to delete orphaned event");
                    report.record_failure(event_id, e.to_string());
                }
            }
        }

        info!(user_id, deleted = report.deleted, failed = report.failed, "cleanup completed");

        Ok(report)
    }

    /// Resolve the dedicated sync calendar id, creating and persisting it on
    /// first use. The user's primary calendar is never used for mirrored
    /// content.
    pub(crate) async fn resolve_calendar(
        &self,
        user_id: &str,
        settings: &SyncSettings,
        token: &str,
    ) -> Result<String> {
        if let Some(id) = &settings.calendar_id {
            if id != PRIMARY_CALENDAR_ID {
                return Ok(id.clone());
            }
        }

        let calendar_id =
            self.calendar.find_or_create_calendar(token, DEDICATED_CALENDAR_NAME).await?;
        self.settings.update_calendar_id(user_id, &calendar_id).await?;
        info!(user_id, calendar_id, "resolved dedicated sync calendar");

        Ok(calendar_id)
    }

    async fn emit(&self, user_id: &str, event: &str, payload: serde_json::Value) {
        self.notifier.emit_to_user(user_id, event, payload).await;
    }

    async fn emit_outcome(&self, user_id: &str, op: &str, result: &Result<SyncReport>) {
        match result {
            Ok(report) => {
                self.emit(
                    user_id,
                    EVENT_SYNC_COMPLETED,
                    json!({
                        "op": op,
                        "created": report.created,
                        "updated": report.updated,
                        "failed": report.failed,
                    }),
                )
                .await;
            }
            Err(e) => {
                self.emit(user_id, EVENT_SYNC_ERROR, json!({ "op": op, "error": e.to_string() }))
                    .await;
            }
        }
    }
}
