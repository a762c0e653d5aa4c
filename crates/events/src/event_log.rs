//! Structured log of every bus event.
//!
//! [`EventLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes each event as a `tracing` record under the `bistro::events`
//! target. It exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::OnboardingEvent;

pub struct EventLog;

impl EventLog {
    /// Run the log loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<OnboardingEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        target: "bistro::events",
                        event_type = %event.event_type,
                        record_id = %event.record_id,
                        owner_id = event.owner_id,
                        actor_user_id = event.actor_user_id,
                        payload = %event.payload,
                        "Onboarding event",
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
    }
}
