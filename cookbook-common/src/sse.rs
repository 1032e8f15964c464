//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE framing for the cookbook services.

use crate::events::FeedEvent;
use axum::response::sse::{Event, KeepAlive};
use std::time::Duration;
use tracing::warn;

/// Interval between heartbeat comments on idle streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Initial event sent to every new SSE client
pub fn connection_status_event(session_id: &str) -> Event {
    Event::default()
        .event("ConnectionStatus")
        .data(format!("connected {}", session_id))
}

/// Frame a domain event for SSE
///
/// The SSE event name is the event's wire name (e.g. `new-recipe`); the data
/// is the JSON-serialized event. Returns `None` (and logs) when the event
/// cannot be serialized.
pub fn to_sse_event(event: &FeedEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Keep-alive policy shared by all SSE endpoints
pub fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")
}
