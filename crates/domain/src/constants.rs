//! Application constants
//!
//! Centralized location for all domain-level constants used by the calendar
//! sync subsystem.

// Dedicated sync calendar
pub const DEDICATED_CALENDAR_NAME: &str = "Teamline";
pub const PRIMARY_CALENDAR_ID: &str = "primary";

// Provenance markers prefixed onto external event titles. These are the wire
// contract with already-created events and must not change.
pub const TASK_MARKER: &str = "[Task]";
pub const TEAM_EVENT_MARKER: &str = "[Team]";
pub const PERSONAL_EVENT_MARKER: &str = "[Personal]";

// Webhook channel lifecycle
pub const CHANNEL_RENEWAL_LEAD_SECS: i64 = 3600; // renew within the last hour
pub const CHANNEL_TTL_SECS: i64 = 7 * 24 * 3600;

// Pull window: generous enough to tolerate long-lived events, never unbounded
pub const DEFAULT_PULL_WINDOW_DAYS: i64 = 365;
pub const MAX_LIST_RESULTS: u32 = 2500;

// Token lifecycle
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 300; // refresh 5 min before expiry

// Provider call budget
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

// Change notifier event names
pub const EVENT_SYNC_STARTED: &str = "sync-started";
pub const EVENT_SYNC_COMPLETED: &str = "sync-completed";
pub const EVENT_SYNC_ERROR: &str = "sync-error";
pub const EVENT_CALENDAR_UPDATED: &str = "calendar-updated";
