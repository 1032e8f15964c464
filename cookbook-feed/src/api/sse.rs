//! Server-Sent Events stream of new recipes
//!
//! Each connection is one registry session. Every session receives every
//! `new-recipe` event, the author's own included; hiding self-authored
//! events is up to the client.

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use cookbook_common::sse::{connection_status_event, keep_alive, to_sse_event, HEARTBEAT_INTERVAL};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    /// Identity of the viewing user, recorded for diagnostics
    pub user_id: Option<String>,
}

/// GET /api/v1/events
pub async fn event_stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut session = state.registry.register(params.user_id.as_deref());
    info!("SSE client connected as session {}", session.id());

    let stream = async_stream::stream! {
        yield Ok(connection_status_event(&session.id().to_string()));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = session.recv() => {
                    match received {
                        Some(event) => {
                            if let Some(sse_event) = to_sse_event(&event) {
                                debug!("SSE: Forwarding {} to session {}", event.event_type(), session.id());
                                yield Ok(sse_event);
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        // Dropping the stream drops `session`, which deregisters it
    };

    Sse::new(stream).keep_alive(keep_alive())
}
