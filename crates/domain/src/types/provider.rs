//! Provider-side event shapes
//!
//! Wire-adjacent types shared by the item mapper and the calendar adapter.
//! The provider represents all-day events as bare dates and timed events as
//! RFC 3339 timestamps; `EventTime` carries exactly one of the two.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Start or end of a provider event: a timed instant or an all-day date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    pub date_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
}

impl EventTime {
    pub fn timed(at: DateTime<Utc>) -> Self {
        Self { date_time: Some(at), date: None }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self { date_time: None, date: Some(date) }
    }

    pub fn is_all_day(&self) -> bool {
        self.date.is_some()
    }

    /// Resolve to an instant: timed value as-is, all-day dates at UTC midnight
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        self.date_time
            .or_else(|| self.date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
    }
}

/// Calendar event in the provider's shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEvent {
    /// Provider-assigned id; None before creation
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub color_id: Option<String>,
    pub recurrence: Vec<String>,
    pub status: Option<String>,
}

/// Result of an access-token refresh against the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefresh {
    pub access_token: String,
    pub expires_in: i64,
}
