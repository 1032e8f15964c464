//! Event types and EventBus for the cookbook event system
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use crate::db::models::Recipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// SSE event name used for newly created recipes
pub const NEW_RECIPE_EVENT: &str = "new-recipe";

/// Cookbook event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A recipe was created
    ///
    /// Triggers:
    /// - SSE: every connected session receives it
    /// - Session listeners: suppress it when the session's own user is the author
    NewRecipe {
        /// Full created record, author populated
        recipe: Recipe,
        /// Human-readable notification text
        message: String,
        /// When the event was emitted
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Build a `NewRecipe` event with the standard message
    pub fn new_recipe(recipe: Recipe) -> Self {
        let message = format!(
            "{} just shared a new recipe: {}",
            recipe.author.display_name(),
            recipe.title
        );
        FeedEvent::NewRecipe {
            recipe,
            message,
            timestamp: Utc::now(),
        }
    }

    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            FeedEvent::NewRecipe { .. } => NEW_RECIPE_EVENT,
        }
    }

    /// Identity of the user whose action caused this event
    pub fn author_id(&self) -> &str {
        match self {
            FeedEvent::NewRecipe { recipe, .. } => &recipe.author.id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged subscribers lose the oldest events rather than stalling the bus
///
/// # Examples
///
/// ```
/// use cookbook_common::events::EventBus;
///
/// let event_bus = EventBus::new(100);
/// let _rx = event_bus.subscribe();
/// assert_eq!(event_bus.subscriber_count(), 1);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FeedEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` (carrying the event back) if no one is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: FeedEvent) -> Result<usize, broadcast::error::SendError<FeedEvent>> {
        self.tx.send(event)
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
