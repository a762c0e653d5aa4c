//! Query parameter types for the onboarding handlers.

use bistro_core::status::OnboardingStatus;
use serde::Deserialize;

/// `GET /onboarding?status=&limit=&offset=`.
///
/// Values are clamped in the handler via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<OnboardingStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `PATCH /onboarding/{id}?seq=`.
///
/// `seq` is the per-slice write sequence number sent by auto-save. Writes
/// without one always apply.
#[derive(Debug, Default, Deserialize)]
pub struct PatchParams {
    pub seq: Option<i64>,
}
