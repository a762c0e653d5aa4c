use std::sync::Arc;

use bistro_core::store::RecordStore;
use bistro_core::submit::SubmitGuard;
use bistro_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Onboarding record storage (PostgreSQL in production).
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<ServerConfig>,
    /// Single entry point for `draft -> submitted` and review transitions.
    pub submit_guard: SubmitGuard,
    /// Centralized event bus for publishing onboarding events.
    pub event_bus: Arc<EventBus>,
}
