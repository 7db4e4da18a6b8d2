//! Syncable item types
//!
//! Tasks and team/personal events are synchronized through one shared shape,
//! `SyncItem`, so the orchestrator never branches on the concrete record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{PERSONAL_EVENT_MARKER, TASK_MARKER, TEAM_EVENT_MARKER};

/// Kind of internal record backing a sync item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Task,
    Event,
}

/// Category a sync item belongs to, matched against per-user toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    TaskDeadline,
    TeamEvent,
    PersonalEvent,
}

impl ItemCategory {
    /// Provenance marker prefixed onto the external event title
    pub fn marker(&self) -> &'static str {
        match self {
            Self::TaskDeadline => TASK_MARKER,
            Self::TeamEvent => TEAM_EVENT_MARKER,
            Self::PersonalEvent => PERSONAL_EVENT_MARKER,
        }
    }

    /// Provider color id for this category (fixed lookup table)
    pub fn color_id(&self) -> &'static str {
        match self {
            Self::TaskDeadline => "11",  // tomato
            Self::TeamEvent => "9",      // blueberry
            Self::PersonalEvent => "10", // basil
        }
    }
}

/// Time window of an item, all-day or timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl TimeWindow {
    /// True when the window is well-formed (`end >= start`)
    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }
}

/// Identity of the mirrored provider event.
///
/// Holding both halves in one value makes the "both set or both absent"
/// invariant structural: an item either has a complete mapping or none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRef {
    pub calendar_id: String,
    pub event_id: String,
}

/// People attached to an item, rendered into the external description as
/// human-readable text rather than separate provider fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    pub assignee: Option<String>,
    pub creator: Option<String>,
    pub collaborators: Vec<String>,
}

/// A task or event as seen by the sync engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItem {
    pub id: String,
    pub user_id: String,
    pub kind: ItemKind,
    pub category: ItemCategory,
    pub title: String,
    pub description: Option<String>,
    pub window: TimeWindow,
    pub participants: Participants,
    /// Validated recurrence expression (RRULE), passed through verbatim
    pub recurrence: Option<String>,
    pub external_ref: Option<ExternalRef>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncItem {
    /// An item is in sync when it was synced at or after its last
    /// content modification
    pub fn is_in_sync(&self) -> bool {
        self.synced_at.is_some_and(|synced| synced >= self.updated_at)
    }

    /// Record a successful sync at `now`
    pub fn mark_synced(&mut self, now: DateTime<Utc>) {
        self.synced_at = Some(now);
    }

    /// Force the item to be picked up by the next push
    pub fn mark_dirty(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
