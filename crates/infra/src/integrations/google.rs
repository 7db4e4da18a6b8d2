//! Google Calendar v3 implementation of the `CalendarPort`.
//!
//! All calls carry a bounded timeout. Deleting an already-deleted event and
//! stopping an already-stopped channel are treated as success; the provider
//! reports both as 404/410.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use teamline_core::CalendarPort;
use teamline_domain::constants::PROVIDER_TIMEOUT_SECS;
use teamline_domain::{
    EventTime, ProviderEvent, Result, TeamlineError, TokenRefresh, WebhookChannel,
};
use tracing::{debug, instrument, warn};

use crate::config::GoogleConfig;
use crate::errors::InfraError;

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google Calendar provider client
pub struct GoogleCalendarClient {
    http: Client,
    api_base: String,
    token_url: String,
    oauth: GoogleConfig,
}

impl GoogleCalendarClient {
    pub fn new(oauth: GoogleConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(InfraError::from)?;

        Ok(Self {
            http,
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            oauth,
        })
    }

    /// Point the client at a different API host (tests use a local mock)
    pub fn with_base_urls(
        mut self,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.token_url = token_url.into();
        self
    }

    async fn check_status(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
        let message = format!("{context} failed ({status}): {body}");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TeamlineError::Auth(message)),
            _ => Err(TeamlineError::Network(message)),
        }
    }
}

#[async_trait]
impl CalendarPort for GoogleCalendarClient {
    #[instrument(skip(self, access_token), fields(calendar_id))]
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<ProviderEvent>> {
        let url = format!("{}/calendars/{}/events", self.api_base, calendar_id);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await
                .map_err(InfraError::from)?;
            let response = Self::check_status(response, "event listing").await?;

            let page: EventsPage = response.json().await.map_err(InfraError::from)?;
            events.extend(page.items.into_iter().map(ProviderEvent::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "listed provider events");
        Ok(events)
    }

    #[instrument(skip(self, access_token, event), fields(calendar_id))]
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &ProviderEvent,
    ) -> Result<ProviderEvent> {
        let url = format!("{}/calendars/{}/events", self.api_base, calendar_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&GoogleEvent::from(event.clone()))
            .send()
            .await
            .map_err(InfraError::from)?;
        let response = Self::check_status(response, "event creation").await?;

        let created: GoogleEvent = response.json().await.map_err(InfraError::from)?;
        Ok(created.into())
    }

    #[instrument(skip(self, access_token, event), fields(calendar_id, event_id))]
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &ProviderEvent,
    ) -> Result<ProviderEvent> {
        let url = format!("{}/calendars/{}/events/{}", self.api_base, calendar_id, event_id);

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(&GoogleEvent::from(event.clone()))
            .send()
            .await
            .map_err(InfraError::from)?;
        let response = Self::check_status(response, "event update").await?;

        let updated: GoogleEvent = response.json().await.map_err(InfraError::from)?;
        Ok(updated.into())
    }

    #[instrument(skip(self, access_token), fields(calendar_id, event_id))]
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()> {
        let url = format!("{}/calendars/{}/events/{}", self.api_base, calendar_id, event_id);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;

        // Already gone counts as deleted
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!(calendar_id, event_id, "event already deleted on provider");
            return Ok(());
        }

        Self::check_status(response, "event deletion").await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn find_or_create_calendar(&self, access_token: &str, name: &str) -> Result<String> {
        let list_url = format!("{}/users/me/calendarList", self.api_base);

        let response = self
            .http
            .get(&list_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;
        let response = Self::check_status(response, "calendar listing").await?;

        let list: CalendarListPage = response.json().await.map_err(InfraError::from)?;
        if let Some(entry) = list.items.iter().find(|c| c.summary.as_deref() == Some(name)) {
            debug!(calendar_id = %entry.id, "found existing dedicated calendar");
            return Ok(entry.id.clone());
        }

        let create_url = format!("{}/calendars", self.api_base);
        let response = self
            .http
            .post(&create_url)
            .bearer_auth(access_token)
            .json(&NewCalendar { summary: name, time_zone: "UTC" })
            .send()
            .await
            .map_err(InfraError::from)?;
        let response = Self::check_status(response, "calendar creation").await?;

        let created: CalendarListEntry = response.json().await.map_err(InfraError::from)?;
        debug!(calendar_id = %created.id, "created dedicated calendar");
        Ok(created.id)
    }

    #[instrument(skip(self, access_token, webhook_url), fields(calendar_id, channel_id))]
    async fn subscribe(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        webhook_url: &str,
        ttl_secs: i64,
    ) -> Result<WebhookChannel> {
        let url = format!("{}/calendars/{}/events/watch", self.api_base, calendar_id);

        let body = WatchRequest {
            id: channel_id,
            channel_type: "web_hook",
            address: webhook_url,
            params: WatchParams { ttl: ttl_secs.to_string() },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(InfraError::from)?;
        let response = Self::check_status(response, "channel registration").await?;

        let watch: WatchResponse = response.json().await.map_err(InfraError::from)?;

        let expiration = watch
            .expiration
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(ttl_secs));

        Ok(WebhookChannel { channel_id: watch.id, resource_id: watch.resource_id, expiration })
    }

    #[instrument(skip(self, access_token), fields(channel_id))]
    async fn unsubscribe(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<()> {
        let url = format!("{}/channels/stop", self.api_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&StopRequest { id: channel_id, resource_id })
            .send()
            .await
            .map_err(InfraError::from)?;

        // A channel that no longer exists is already stopped
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            warn!(channel_id, "channel already gone on provider");
            return Ok(());
        }

        Self::check_status(response, "channel stop").await?;
        Ok(())
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRefresh> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.oauth.client_id.as_str()),
                ("client_secret", self.oauth.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(TeamlineError::Auth(format!("token refresh failed ({status}): {body}")));
        }

        let refreshed: TokenResponse = response.json().await.map_err(InfraError::from)?;
        Ok(TokenRefresh {
            access_token: refreshed.access_token,
            expires_in: refreshed.expires_in,
        })
    }
}

/* -------------------------------------------------------------------------- */
/* Wire types */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: GoogleEventTime,
    end: GoogleEventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    recurrence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
}

impl From<GoogleEvent> for ProviderEvent {
    fn from(event: GoogleEvent) -> Self {
        ProviderEvent {
            id: event.id,
            summary: event.summary,
            description: event.description,
            start: EventTime { date_time: event.start.date_time, date: event.start.date },
            end: EventTime { date_time: event.end.date_time, date: event.end.date },
            color_id: event.color_id,
            recurrence: event.recurrence,
            status: event.status,
        }
    }
}

impl From<ProviderEvent> for GoogleEvent {
    fn from(event: ProviderEvent) -> Self {
        GoogleEvent {
            id: event.id,
            summary: event.summary,
            description: event.description,
            start: GoogleEventTime { date_time: event.start.date_time, date: event.start.date },
            end: GoogleEventTime { date_time: event.end.date_time, date: event.end.date },
            color_id: event.color_id,
            recurrence: event.recurrence,
            status: event.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalendarListPage {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCalendar<'a> {
    summary: &'a str,
    time_zone: &'a str,
}

#[derive(Debug, Serialize)]
struct WatchRequest<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    channel_type: &'a str,
    address: &'a str,
    params: WatchParams,
}

#[derive(Debug, Serialize)]
struct WatchParams {
    ttl: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchResponse {
    id: String,
    resource_id: String,
    expiration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest<'a> {
    id: &'a str,
    resource_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}
