pub mod health;
pub mod onboarding;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /onboarding                                      list, create
/// /onboarding/start                                wizard entry point
/// /onboarding/{id}                                 get, patch
/// /onboarding/{id}/submit                          submit (POST)
/// /onboarding/{id}/advance                         record progress (POST)
/// /onboarding/{id}/steps/{token}                   step view
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/onboarding", onboarding::router())
}
