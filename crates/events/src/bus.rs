//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the HTTP handlers, the
//! submission notifier and the event log.

use bistro_core::record::OnboardingRecord;
use bistro_core::types::{DbId, RecordId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event names published on the bus.
pub mod names {
    pub const ONBOARDING_CREATED: &str = "onboarding.created";
    pub const ONBOARDING_SUBMITTED: &str = "onboarding.submitted";
    pub const ONBOARDING_STATUS_CHANGED: &str = "onboarding.status_changed";
}

// ---------------------------------------------------------------------------
// OnboardingEvent
// ---------------------------------------------------------------------------

/// Something that happened to an onboarding record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingEvent {
    /// Dot-separated event name, e.g. `"onboarding.submitted"`.
    pub event_type: String,
    pub record_id: RecordId,
    pub owner_id: DbId,
    /// User that triggered the event, when known.
    pub actor_user_id: Option<DbId>,
    /// Event-specific data.
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl OnboardingEvent {
    /// An event about `record` with an empty payload.
    pub fn for_record(event_type: impl Into<String>, record: &OnboardingRecord) -> Self {
        Self {
            event_type: event_type.into(),
            record_id: record.id,
            owner_id: record.owner_id,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
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

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest un-consumed events are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<OnboardingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: OnboardingEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OnboardingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
