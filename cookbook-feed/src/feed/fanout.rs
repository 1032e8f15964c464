//! Notification fan-out
//!
//! [`ConnectionRegistry`] owns the live sessions and the [`EventBus`] they
//! listen on. Delivery is best-effort and at-most-once: no replay, no
//! acknowledgement, and a lagging session loses the oldest events.
//!
//! The registry does not know which session belongs to which author, so
//! self-notification suppression happens on the consumer side in
//! [`SessionListener`].

use chrono::{DateTime, Utc};
use cookbook_common::db::Recipe;
use cookbook_common::events::{EventBus, FeedEvent};
use cookbook_common::{identity, same_identity, time};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bookkeeping for one connected session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Identity the session announced, if any
    pub identity: Option<String>,
    pub connected_at: DateTime<Utc>,
}

type Sessions = HashMap<Uuid, SessionInfo>;
type SessionTable = Arc<RwLock<Sessions>>;

fn write_table(table: &RwLock<Sessions>) -> RwLockWriteGuard<'_, Sessions> {
    table.write().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of live sessions
#[derive(Clone)]
pub struct ConnectionRegistry {
    bus: EventBus,
    sessions: SessionTable,
}

impl ConnectionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            bus: EventBus::new(capacity),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a session; it receives every event broadcast from now on
    pub fn register(&self, announced: Option<&str>) -> SessionHandle {
        let id = Uuid::new_v4();
        let identity = announced
            .map(identity::normalize)
            .filter(|identity| !identity.is_empty());

        let receiver = self.bus.subscribe();
        write_table(&self.sessions).insert(
            id,
            SessionInfo {
                identity: identity.clone(),
                connected_at: time::now(),
            },
        );
        info!(
            "Session {} connected (identity: {})",
            id,
            identity.as_deref().unwrap_or("anonymous")
        );

        SessionHandle {
            id,
            receiver,
            sessions: Arc::clone(&self.sessions),
        }
    }

    /// Queue `event` for every connected session
    ///
    /// Never blocks and never fails. Returns how many sessions it was queued for.
    pub fn broadcast(&self, event: FeedEvent) -> usize {
        match self.bus.emit(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No connected sessions; event dropped");
                0
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn session(&self, id: Uuid) -> Option<SessionInfo> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// One live session; dropping it deregisters the session
pub struct SessionHandle {
    id: Uuid,
    receiver: Receiver<FeedEvent>,
    sessions: SessionTable,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the registry is gone
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session {} lagged, {} events dropped", self.id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-queued event without waiting
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Session {} lagged, {} events dropped", self.id, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        write_table(&self.sessions).remove(&self.id);
        info!("Session {} disconnected", self.id);
    }
}

/// Consumer-side view of a session that hides the viewer's own events
pub struct SessionListener {
    handle: SessionHandle,
    viewer: Option<String>,
}

impl SessionListener {
    pub fn new(handle: SessionHandle, viewer: Option<&str>) -> Self {
        Self {
            handle,
            viewer: viewer.map(identity::normalize),
        }
    }

    /// Whether `viewer` should be shown `event`
    pub fn should_surface(event: &FeedEvent, viewer: Option<&str>) -> bool {
        match viewer {
            Some(viewer) => !same_identity(event.author_id(), viewer),
            None => true,
        }
    }

    /// Wait for the next event that is not the viewer's own
    pub async fn next_visible(&mut self) -> Option<FeedEvent> {
        while let Some(event) = self.handle.recv().await {
            if Self::should_surface(&event, self.viewer.as_deref()) {
                return Some(event);
            }
            debug!("Session {} suppressed its own event", self.handle.id());
        }
        None
    }

    /// Non-blocking variant of [`next_visible`](Self::next_visible)
    pub fn try_next_visible(&mut self) -> Option<FeedEvent> {
        while let Some(event) = self.handle.try_recv() {
            if Self::should_surface(&event, self.viewer.as_deref()) {
                return Some(event);
            }
        }
        None
    }
}

/// Boundary hook run after a recipe has been persisted
#[derive(Clone)]
pub struct Notifier {
    registry: ConnectionRegistry,
}

impl Notifier {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Broadcast a `new-recipe` event; returns the number of sessions reached
    pub fn on_recipe_created(&self, recipe: &Recipe) -> usize {
        let delivered = self.registry.broadcast(FeedEvent::new_recipe(recipe.clone()));
        info!("New recipe {} announced to {} sessions", recipe.id, delivered);
        delivered
    }
}
