//! In-process governance event bus backed by a `tokio::sync::broadcast`
//! channel.
//!
//! Every successful invitation transition and hierarchy mutation publishes
//! a [`GovernanceEvent`]; the notification dispatcher (and anything else
//! interested in staffing/budget changes) subscribes here. Lossy by
//! design: publishing with no subscribers is fine, and lagging subscribers
//! drop the oldest events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use jalon_core::types::DbId;

/// Broadcast channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A governance event, e.g. `"invitation.accepted"` or `"task.created"`.
///
/// Constructed via [`GovernanceEvent::new`] and enriched with the builder
/// methods [`with_source`](GovernanceEvent::with_source),
/// [`with_actor`](GovernanceEvent::with_actor), and
/// [`with_payload`](GovernanceEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEvent {
    /// Dot-separated event name, e.g. `"invitation.accepted"`.
    pub event_type: String,

    /// Source entity kind (e.g. `"invitation"`, `"task"`).
    pub source_entity_type: Option<String>,

    /// Source entity database id.
    pub source_entity_id: Option<DbId>,

    /// The user whose action produced the event, when one exists
    /// (expiry is backend-driven and has no actor).
    pub actor_user_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl GovernanceEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Publish/subscribe hub for [`GovernanceEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GovernanceEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GovernanceEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: GovernanceEvent) {
        tracing::debug!(event_type = %event.event_type, "governance event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
