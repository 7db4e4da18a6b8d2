//! HTTP endpoint receiving provider push notifications.
//!
//! The provider retries (and eventually disables) channels whose deliveries
//! fail, so this endpoint answers `200 OK` unconditionally: malformed
//! deliveries are logged and dropped, never rejected.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use teamline_core::ChannelManager;
use teamline_domain::ResourceState;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";

/// Build the webhook router over a shared channel manager.
pub fn router(channels: Arc<ChannelManager>) -> Router {
    Router::new().route("/webhooks/calendar", post(receive_notification)).with_state(channels)
}

/// Bind and serve the webhook router until the task is aborted.
pub async fn serve(channels: Arc<ChannelManager>, bind_addr: &str) -> teamline_domain::Result<()> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
        teamline_domain::TeamlineError::Config(format!("failed to bind {bind_addr}: {e}"))
    })?;
    info!(bind_addr, "webhook endpoint listening");

    axum::serve(listener, router(channels)).await.map_err(|e| {
        teamline_domain::TeamlineError::Internal(format!("webhook server failed: {e}"))
    })
}

async fn receive_notification(
    State(channels): State<Arc<ChannelManager>>,
    headers: HeaderMap,
) -> StatusCode {
    let channel_id = match header_str(&headers, CHANNEL_ID_HEADER) {
        Some(id) => id,
        None => {
            warn!("notification missing channel id header, dropping");
            return StatusCode::OK;
        }
    };

    let resource_state = match header_str(&headers, RESOURCE_STATE_HEADER)
        .and_then(|raw| ResourceState::parse(&raw))
    {
        Some(state) => state,
        None => {
            warn!(channel_id, "notification with missing or unknown resource state, dropping");
            return StatusCode::OK;
        }
    };

    let resource_id = header_str(&headers, RESOURCE_ID_HEADER);
    debug!(channel_id, ?resource_id, ?resource_state, "received provider notification");

    // Spawned so slow pulls never delay the 200 back to the provider
    tokio::spawn(async move {
        channels.handle_notification(&channel_id, resource_state).await;
    });

    StatusCode::OK
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    match headers.get(name) {
        Some(value) => match value.to_str() {
            Ok(s) => Some(s.to_string()),
            Err(_) => {
                error!(header = name, "non-UTF-8 header value");
                None
            }
        },
        None => None,
    }
}
