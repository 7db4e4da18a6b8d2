//! In-memory mock for the `CalendarPort`.
//!
//! Records every call in order so tests can assert on the exact provider
//! traffic (including "zero provider calls" properties), and keeps a simple
//! event store standing in for the dedicated sync calendar.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use teamline_core::calendar_ports::CalendarPort;
use teamline_domain::{
    ProviderEvent, Result as DomainResult, TeamlineError, TokenRefresh, WebhookChannel,
};

#[derive(Default)]
struct MockCalendarState {
    events: Vec<ProviderEvent>,
    calls: Vec<String>,
    next_event_seq: usize,
    fail_refresh: bool,
    fail_create_containing: Option<String>,
    fail_delete_ids: Vec<String>,
    fail_unsubscribe: bool,
}

/// Recording mock of the calendar provider
#[derive(Clone, Default)]
pub struct MockCalendarPort {
    state: Arc<Mutex<MockCalendarState>>,
}

impl MockCalendarPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event as already present on the provider side.
    pub fn with_event(self, event: ProviderEvent) -> Self {
        self.state.lock().unwrap().events.push(event);
        self
    }

    /// Make token refresh fail.
    pub fn failing_refresh(self) -> Self {
        self.state.lock().unwrap().fail_refresh = true;
        self
    }

    /// Make `create_event` fail for events whose summary contains `needle`.
    pub fn failing_create_containing(self, needle: &str) -> Self {
        self.state.lock().unwrap().fail_create_containing = Some(needle.to_string());
        self
    }

    /// Make `delete_event` fail for a specific event id.
    pub fn failing_delete(self, event_id: &str) -> Self {
        self.state.lock().unwrap().fail_delete_ids.push(event_id.to_string());
        self
    }

    /// Make `unsubscribe` fail.
    pub fn failing_unsubscribe(self) -> Self {
        self.state.lock().unwrap().fail_unsubscribe = true;
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Number of provider write calls (create/update/delete).
    pub fn write_count(&self) -> usize {
        self.call_count("create_event")
            + self.call_count("update_event")
            + self.call_count("delete_event")
    }

    /// Current provider-side events.
    pub fn events(&self) -> Vec<ProviderEvent> {
        self.state.lock().unwrap().events.clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }
}

#[async_trait]
impl CalendarPort for MockCalendarPort {
    async fn list_events(
        &self,
        _access_token: &str,
        calendar_id: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _max_results: u32,
    ) -> DomainResult<Vec<ProviderEvent>> {
        self.log(format!("list_events:{calendar_id}"));
        Ok(self.state.lock().unwrap().events.clone())
    }

    async fn create_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event: &ProviderEvent,
    ) -> DomainResult<ProviderEvent> {
        self.log(format!("create_event:{calendar_id}"));

        let mut state = self.state.lock().unwrap();
        if let Some(needle) = &state.fail_create_containing {
            if event.summary.as_deref().is_some_and(|s| s.contains(needle.as_str())) {
                return Err(TeamlineError::Network("provider rejected create".into()));
            }
        }

        state.next_event_seq += 1;
        let mut created = event.clone();
        created.id = Some(format!("evt-{}", state.next_event_seq));
        state.events.push(created.clone());
        Ok(created)
    }

    async fn update_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &ProviderEvent,
    ) -> DomainResult<ProviderEvent> {
        self.log(format!("update_event:{calendar_id}:{event_id}"));

        let mut state = self.state.lock().unwrap();
        let mut updated = event.clone();
        updated.id = Some(event_id.to_string());
        match state.events.iter_mut().find(|e| e.id.as_deref() == Some(event_id)) {
            Some(existing) => *existing = updated.clone(),
            None => {
                return Err(TeamlineError::NotFound(format!("no provider event {event_id}")))
            }
        }
        Ok(updated)
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> DomainResult<()> {
        self.log(format!("delete_event:{calendar_id}:{event_id}"));

        let mut state = self.state.lock().unwrap();
        if state.fail_delete_ids.iter().any(|id| id == event_id) {
            return Err(TeamlineError::Network("provider rejected delete".into()));
        }
        // "not found" is success, matching the port contract
        state.events.retain(|e| e.id.as_deref() != Some(event_id));
        Ok(())
    }

    async fn find_or_create_calendar(
        &self,
        _access_token: &str,
        name: &str,
    ) -> DomainResult<String> {
        self.log(format!("find_or_create_calendar:{name}"));
        Ok("cal-teamline".to_string())
    }

    async fn subscribe(
        &self,
        _access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        _webhook_url: &str,
        ttl_secs: i64,
    ) -> DomainResult<WebhookChannel> {
        self.log(format!("subscribe:{calendar_id}"));
        Ok(WebhookChannel {
            channel_id: channel_id.to_string(),
            resource_id: "res-1".to_string(),
            expiration: Utc::now() + Duration::seconds(ttl_secs),
        })
    }

    async fn unsubscribe(
        &self,
        _access_token: &str,
        channel_id: &str,
        _resource_id: &str,
    ) -> DomainResult<()> {
        self.log(format!("unsubscribe:{channel_id}"));
        if self.state.lock().unwrap().fail_unsubscribe {
            return Err(TeamlineError::Network("unsubscribe failed".into()));
        }
        Ok(())
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> DomainResult<TokenRefresh> {
        self.log("refresh_access_token".to_string());
        if self.state.lock().unwrap().fail_refresh {
            return Err(TeamlineError::Network("refresh token rejected".into()));
        }
        Ok(TokenRefresh { access_token: "fresh-token".to_string(), expires_in: 3600 })
    }
}
