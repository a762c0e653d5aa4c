//! Route definitions for onboarding records and the wizard.
//!
//! Mounted at `/onboarding` by `api_routes()`.
//!
//! ```text
//! POST   /                              create_record
//! GET    /                              list_records (?status, limit, offset)
//! GET    /start                         start_wizard (303 to step 1)
//! GET    /{id}                          get_record
//! PATCH  /{id}                          patch_record (?seq)
//! POST   /{id}/submit                   submit_record
//! POST   /{id}/advance                  advance
//! GET    /{id}/steps/{token}            get_step
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{onboarding, wizard};
use crate::state::AppState;

/// Onboarding routes, mounted at `/onboarding`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(onboarding::list_records).post(onboarding::create_record),
        )
        .route("/start", get(wizard::start_wizard))
        .route(
            "/{id}",
            get(onboarding::get_record).patch(onboarding::patch_record),
        )
        .route("/{id}/submit", post(onboarding::submit_record))
        .route("/{id}/advance", post(wizard::advance))
        .route("/{id}/steps/{token}", get(wizard::get_step))
}
