//! Repository for the `onboarding_records` table.

use bistro_core::slices::SliceName;
use bistro_core::status::OnboardingStatus;
use bistro_core::types::{DbId, JsonMap, RecordId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::onboarding_record::OnboardingRecordRow;

/// Column list for `onboarding_records` queries.
const COLUMNS: &str = "id, owner_id, status, furthest_step, \
     restaurant_info, contact, business_data, tech_setup, tables, menu, agreement, \
     slice_versions, submitted_at, created_at, updated_at";

/// Provides persistence operations for onboarding records.
pub struct OnboardingRecordRepo;

impl OnboardingRecordRepo {
    /// Insert a new draft with empty slices.
    pub async fn create(
        pool: &PgPool,
        id: RecordId,
        owner_id: DbId,
    ) -> Result<OnboardingRecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_records (id, owner_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_one(pool)
            .await
    }

    /// Find an onboarding record by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: RecordId,
    ) -> Result<Option<OnboardingRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM onboarding_records WHERE id = $1");
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List records, newest first, optionally scoped to an owner and status.
    pub async fn list(
        pool: &PgPool,
        owner_id: Option<DbId>,
        status: Option<OnboardingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnboardingRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_records \
             WHERE ($1::BIGINT IS NULL OR owner_id = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(owner_id)
            .bind(status.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Shallow-merge `fields` into one slice column.
    ///
    /// With a sequence number, the update only happens when `seq` is not
    /// lower than the one stored for the slice; `None` then means the record
    /// is missing or the write was stale.
    pub async fn patch_slice(
        pool: &PgPool,
        id: RecordId,
        slice: SliceName,
        fields: &JsonMap,
        seq: Option<i64>,
    ) -> Result<Option<OnboardingRecordRow>, sqlx::Error> {
        let column = slice.column();
        let query = format!(
            "UPDATE onboarding_records \
             SET {column} = {column} || $2::JSONB, \
                 slice_versions = CASE WHEN $3::BIGINT IS NULL THEN slice_versions \
                     ELSE jsonb_set(slice_versions, ARRAY[$4::TEXT], to_jsonb($3::BIGINT)) END, \
                 updated_at = NOW() \
             WHERE id = $1 \
               AND ($3::BIGINT IS NULL \
                    OR COALESCE((slice_versions ->> $4::TEXT)::BIGINT, $3::BIGINT) <= $3::BIGINT) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .bind(Json(fields))
            .bind(seq)
            .bind(slice.key())
            .fetch_optional(pool)
            .await
    }

    /// Raise `furthest_step` to `reached` if it is lower.
    pub async fn record_progress(
        pool: &PgPool,
        id: RecordId,
        reached: i16,
    ) -> Result<Option<OnboardingRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_records \
             SET updated_at = CASE WHEN $2 > furthest_step THEN NOW() ELSE updated_at END, \
                 furthest_step = GREATEST(furthest_step, $2) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .bind(reached)
            .fetch_optional(pool)
            .await
    }

    /// Flip `draft -> submitted`. Matches nothing once the record has left
    /// `draft`.
    pub async fn mark_submitted(
        pool: &PgPool,
        id: RecordId,
        at: Timestamp,
    ) -> Result<Option<OnboardingRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_records \
             SET status = 'submitted', submitted_at = $2, updated_at = $2 \
             WHERE id = $1 AND status = 'draft' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Move the status from `from` to `to`. Matches nothing when the stored
    /// status is no longer `from`.
    pub async fn transition_status(
        pool: &PgPool,
        id: RecordId,
        from: OnboardingStatus,
        to: OnboardingStatus,
    ) -> Result<Option<OnboardingRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_records \
             SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingRecordRow>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }
}
