//! Shared test helpers for `teamline-core` integration tests.
//!
//! These helpers provide reusable fixtures and lightweight mocks so the sync
//! engine tests can focus on behaviour instead of boilerplate.

pub mod calendar;
pub mod repositories;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use teamline_core::SyncEngine;
use teamline_domain::{
    ItemCategory, ItemKind, Participants, SyncItem, SyncSettings, TimeWindow,
};

use calendar::MockCalendarPort;
use repositories::{MockItemRepository, MockSettingsRepository, RecordingNotifier};

/// Fully wired engine over in-memory mocks.
pub struct Harness {
    pub settings: MockSettingsRepository,
    pub items: MockItemRepository,
    pub calendar: MockCalendarPort,
    pub notifier: RecordingNotifier,
    pub engine: Arc<SyncEngine>,
}

impl Harness {
    pub fn new(
        settings: MockSettingsRepository,
        items: MockItemRepository,
        calendar: MockCalendarPort,
    ) -> Self {
        let notifier = RecordingNotifier::new();
        let engine = Arc::new(SyncEngine::new(
            Arc::new(settings.clone()),
            Arc::new(items.clone()),
            Arc::new(calendar.clone()),
            Arc::new(notifier.clone()),
        ));
        Self { settings, items, calendar, notifier, engine }
    }
}

/// Settings row for an enabled user with valid tokens and a resolved
/// dedicated calendar.
pub fn enabled_settings(user_id: &str, calendar_id: &str) -> SyncSettings {
    let mut settings = SyncSettings::new(user_id);
    settings.calendar_id = Some(calendar_id.to_string());
    settings.access_token = Some("valid-token".to_string());
    settings.refresh_token = Some("refresh-token".to_string());
    settings.token_expiry = Some(Utc::now() + Duration::hours(1));
    settings
}

/// A dirty task item with a one-day all-day window and no external mapping.
pub fn task_due(user_id: &str, item_id: &str, title: &str) -> SyncItem {
    let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    SyncItem {
        id: item_id.to_string(),
        user_id: user_id.to_string(),
        kind: ItemKind::Task,
        category: ItemCategory::TaskDeadline,
        title: title.to_string(),
        description: None,
        window: TimeWindow { start: due, end: due, all_day: true },
        participants: Participants::default(),
        recurrence: None,
        external_ref: None,
        updated_at: Utc::now(),
        synced_at: None,
    }
}

/// A dirty timed team event without an external mapping.
pub fn team_event(user_id: &str, item_id: &str, title: &str) -> SyncItem {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap();
    SyncItem {
        id: item_id.to_string(),
        user_id: user_id.to_string(),
        kind: ItemKind::Event,
        category: ItemCategory::TeamEvent,
        title: title.to_string(),
        description: Some("Weekly planning".to_string()),
        window: TimeWindow { start, end: start + Duration::hours(1), all_day: false },
        participants: Participants::default(),
        recurrence: None,
        external_ref: None,
        updated_at: Utc::now(),
        synced_at: None,
    }
}
