//! Wizard routing: entry point, step views, progress.
//!
//! A step URL that cannot be resolved (malformed id, unknown or foreign
//! record, bad step token) sends the caller back to the entry point, which
//! always starts a fresh record.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use bistro_core::backend::advance_progress;
use bistro_core::error::CoreError;
use bistro_core::navigation::WizardPosition;
use bistro_core::types::RecordId;
use bistro_core::wizard::StepView;
use serde::{Deserialize, Serialize};

use super::onboarding::{create_draft, ensure_visible, find_visible};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Where unresolvable step URLs are sent.
pub const WIZARD_ENTRY_PATH: &str = "/api/v1/onboarding/start";

/// Path of the step view for `position` of record `id`.
pub fn step_path(id: RecordId, position: WizardPosition) -> String {
    format!("/api/v1/onboarding/{id}/steps/{}", position.token())
}

fn to_entry_point(reason: &'static str, raw_id: &str, token: &str) -> Response {
    tracing::info!(raw_id, token, reason, "Unresolvable wizard URL, redirecting to entry point");
    Redirect::to(WIZARD_ENTRY_PATH).into_response()
}

// ---------------------------------------------------------------------------
// GET /onboarding/start
// ---------------------------------------------------------------------------

/// Create a fresh record and redirect to its first step.
pub async fn start_wizard(State(state): State<AppState>, auth: AuthUser) -> AppResult<Redirect> {
    let record = create_draft(&state, &auth).await?;
    Ok(Redirect::to(&step_path(record.id, WizardPosition::first())))
}

// ---------------------------------------------------------------------------
// GET /onboarding/{id}/steps/{token}
// ---------------------------------------------------------------------------

pub async fn get_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((raw_id, token)): Path<(String, String)>,
) -> AppResult<Response> {
    let Ok(id) = RecordId::parse_str(&raw_id) else {
        return Ok(to_entry_point("malformed id", &raw_id, &token));
    };
    let Ok(position) = WizardPosition::parse_token(&token) else {
        return Ok(to_entry_point("invalid step", &raw_id, &token));
    };
    let Some(record) = find_visible(&state, &auth, id).await? else {
        return Ok(to_entry_point("unknown record", &raw_id, &token));
    };

    if position.ordinal() > record.furthest_step {
        return Err(AppError::Core(CoreError::StepNotReached {
            requested: position.token(),
            furthest: record.furthest_position().token(),
        }));
    }

    Ok(Json(DataResponse {
        data: StepView::for_record(&record, position),
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// POST /onboarding/{id}/advance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// Position the wizard is leaving.
    pub from: WizardPosition,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub position: WizardPosition,
}

/// Record that the wizard moved past `from`.
pub async fn advance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
    body: Result<Json<AdvanceRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    ensure_visible(&state, &auth, id).await?;
    let position = advance_progress(state.store.as_ref(), id, body.from).await?;

    Ok(Json(DataResponse {
        data: AdvanceResponse { position },
    }))
}
