//! Event bus and submission notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OnboardingEvent`]: the event envelope published on it.
//! - [`EventLog`]: background subscriber writing every event to the log.
//! - [`delivery`]: external delivery channels (webhook, email).
//! - [`EventNotifier`]: the post-submit side effect used by the Submit
//!   Guard.

pub mod bus;
pub mod delivery;
pub mod event_log;
pub mod notifier;

pub use bus::{names, EventBus, OnboardingEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::webhook::WebhookDelivery;
pub use event_log::EventLog;
pub use notifier::{EventNotifier, NotificationConfig};
