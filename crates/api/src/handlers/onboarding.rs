//! Handlers for onboarding records.
//!
//! Every handler takes the authenticated caller. Records owned by someone
//! else are reported as missing unless the caller is an admin.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bistro_core::error::CoreError;
use bistro_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use bistro_core::record::{OnboardingRecord, RecordPatch};
use bistro_core::status::OnboardingStatus;
use bistro_core::store::ListFilter;
use bistro_core::types::{JsonMap, RecordId};
use bistro_events::{names, OnboardingEvent};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{ListParams, PatchParams};
use crate::response::{DataResponse, PatchResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load record `id` if the caller may see it.
pub(crate) async fn find_visible(
    state: &AppState,
    auth: &AuthUser,
    id: RecordId,
) -> AppResult<Option<OnboardingRecord>> {
    let record = state.store.find_by_id(id).await?;
    Ok(record.filter(|r| auth.can_access(r)))
}

/// Like [`find_visible`], but a missing record is a 404.
pub(crate) async fn ensure_visible(
    state: &AppState,
    auth: &AuthUser,
    id: RecordId,
) -> AppResult<OnboardingRecord> {
    find_visible(state, auth, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::record_not_found(id)))
}

/// Insert a fresh draft for the caller and announce it.
pub(crate) async fn create_draft(state: &AppState, auth: &AuthUser) -> AppResult<OnboardingRecord> {
    let record = state.store.create(auth.user_id).await?;

    state.event_bus.publish(
        OnboardingEvent::for_record(names::ONBOARDING_CREATED, &record).with_actor(auth.user_id),
    );
    tracing::info!(record_id = %record.id, user_id = auth.user_id, "Onboarding record created");
    Ok(record)
}

// ---------------------------------------------------------------------------
// POST /onboarding
// ---------------------------------------------------------------------------

pub async fn create_record(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let record = create_draft(&state, &auth).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

// ---------------------------------------------------------------------------
// GET /onboarding
// ---------------------------------------------------------------------------

/// List records, newest first. Non-admins only see their own.
pub async fn list_records(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = ListFilter {
        owner_id: (!auth.is_admin()).then_some(auth.user_id),
        status: params.status,
    };
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let records = state.store.list(filter, limit, offset).await?;
    Ok(Json(DataResponse { data: records }))
}

// ---------------------------------------------------------------------------
// GET /onboarding/{id}
// ---------------------------------------------------------------------------

pub async fn get_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
) -> AppResult<impl IntoResponse> {
    let record = ensure_visible(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// PATCH /onboarding/{id}
// ---------------------------------------------------------------------------

/// Merge slice fields and/or move the record's status.
///
/// Slices are merged shallowly, one at a time, with the `seq` query
/// parameter guarding against out-of-order auto-saves. Slice writes are
/// accepted in every status. A `status` key is
/// applied after the slices: `submitted` runs the Submit Guard, later review
/// statuses need the admin role.
pub async fn patch_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
    Query(params): Query<PatchParams>,
    body: Result<Json<JsonMap>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let mut record = ensure_visible(&state, &auth, id).await?;
    let patch = RecordPatch::from_body(body)?;

    let mut applied = true;
    for (slice, fields) in patch.slices {
        let outcome = state
            .store
            .patch_slice(id, slice, fields, params.seq)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::record_not_found(id)))?;

        if outcome.applied {
            tracing::debug!(record_id = %id, slice = %slice, seq = ?params.seq, "Slice patched");
        } else {
            tracing::info!(record_id = %id, slice = %slice, seq = ?params.seq, "Stale slice write discarded");
        }
        applied &= outcome.applied;
        record = outcome.record;
    }

    if let Some(to) = patch.status {
        record = change_status(&state, &auth, id, to).await?;
    }

    Ok(Json(PatchResponse {
        data: record,
        applied,
    }))
}

async fn change_status(
    state: &AppState,
    auth: &AuthUser,
    id: RecordId,
    to: OnboardingStatus,
) -> AppResult<OnboardingRecord> {
    if to == OnboardingStatus::Submitted {
        return Ok(state.submit_guard.submit(id).await?);
    }
    if !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Moving a record to '{to}' requires the admin role"
        ))));
    }

    let record = state.submit_guard.transition(id, to).await?;
    state.event_bus.publish(
        OnboardingEvent::for_record(names::ONBOARDING_STATUS_CHANGED, &record)
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({ "status": to })),
    );
    Ok(record)
}

// ---------------------------------------------------------------------------
// POST /onboarding/{id}/submit
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub record: OnboardingRecord,
}

pub async fn submit_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
) -> AppResult<impl IntoResponse> {
    ensure_visible(&state, &auth, id).await?;
    let record = state.submit_guard.submit(id).await?;

    Ok(Json(DataResponse {
        data: SubmitResponse {
            message: "Onboarding submitted".to_string(),
            record,
        },
    }))
}
