//! Calendar provider port interface
//!
//! The external calendar is a black-box capability: list, create, update and
//! delete events, find or create the dedicated sync calendar, manage a
//! push-notification channel, and refresh access tokens. Implementations live
//! in the infrastructure crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teamline_domain::{ProviderEvent, Result, TokenRefresh, WebhookChannel};

/// Trait for calendar provider operations
///
/// Every call takes the caller's access token; token lifecycle is the
/// [`TokenManager`](crate::token::TokenManager)'s concern, not the
/// provider's.
#[async_trait]
pub trait CalendarPort: Send + Sync {
    /// List events of a calendar within a bounded time range
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<ProviderEvent>>;

    /// Create an event, returning it with the provider-assigned id
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &ProviderEvent,
    ) -> Result<ProviderEvent>;

    /// Update an existing event at the given id
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &ProviderEvent,
    ) -> Result<ProviderEvent>;

    /// Delete an event. Implementations treat "not found" as success.
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()>;

    /// Find a calendar by its display name, creating it when absent
    async fn find_or_create_calendar(&self, access_token: &str, name: &str) -> Result<String>;

    /// Subscribe a push-notification channel for a calendar
    async fn subscribe(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        webhook_url: &str,
        ttl_secs: i64,
    ) -> Result<WebhookChannel>;

    /// Stop a push-notification channel. Implementations treat an already
    /// expired or unknown channel as success.
    async fn unsubscribe(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<()>;

    /// Exchange a refresh token for a fresh access token
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRefresh>;
}
