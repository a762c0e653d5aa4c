//! PostgreSQL-backed [`RecordStore`].

use async_trait::async_trait;
use bistro_core::error::CoreError;
use bistro_core::record::{OnboardingRecord, PatchOutcome};
use bistro_core::slices::SliceName;
use bistro_core::status::OnboardingStatus;
use bistro_core::store::{ListFilter, RecordStore};
use bistro_core::types::{DbId, JsonMap, RecordId, Timestamp};

use crate::models::onboarding_record::OnboardingRecordRow;
use crate::repositories::OnboardingRecordRepo;
use crate::DbPool;

/// Map a sqlx error into the domain error type.
///
/// - Unique violations (23505) become `Conflict`.
/// - Check violations (23514) become `Validation`.
/// - Everything else becomes `Persistence`, logged with the driver message.
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some("23505") => {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ))
            }
            Some("23514") => {
                return CoreError::Validation(format!("Check constraint violated: {constraint}"))
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Persistence(err.to_string())
}

fn into_record(row: OnboardingRecordRow) -> Result<OnboardingRecord, CoreError> {
    OnboardingRecord::try_from(row)
}

fn into_optional(row: Option<OnboardingRecordRow>) -> Result<Option<OnboardingRecord>, CoreError> {
    row.map(into_record).transpose()
}

/// Record store over the `onboarding_records` table.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, owner_id: DbId) -> Result<OnboardingRecord, CoreError> {
        let row = OnboardingRecordRepo::create(&self.pool, uuid::Uuid::now_v7(), owner_id)
            .await
            .map_err(map_db_error)?;
        into_record(row)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<OnboardingRecord>, CoreError> {
        let row = OnboardingRecordRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        into_optional(row)
    }

    async fn list(
        &self,
        filter: ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnboardingRecord>, CoreError> {
        OnboardingRecordRepo::list(&self.pool, filter.owner_id, filter.status, limit, offset)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(into_record)
            .collect()
    }

    async fn patch_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: Option<i64>,
    ) -> Result<Option<PatchOutcome>, CoreError> {
        let updated = OnboardingRecordRepo::patch_slice(&self.pool, id, slice, &fields, seq)
            .await
            .map_err(map_db_error)?;
        if let Some(row) = updated {
            return Ok(Some(PatchOutcome {
                applied: true,
                record: into_record(row)?,
            }));
        }

        // Either the record is missing or the sequence number was stale.
        let current = self.find_by_id(id).await?;
        if current.is_some() {
            tracing::debug!(record_id = %id, slice = %slice, seq, "Discarded stale slice write");
        }
        Ok(current.map(|record| PatchOutcome {
            applied: false,
            record,
        }))
    }

    async fn record_progress(
        &self,
        id: RecordId,
        ordinal: u8,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        let row = OnboardingRecordRepo::record_progress(&self.pool, id, i16::from(ordinal))
            .await
            .map_err(map_db_error)?;
        into_optional(row)
    }

    async fn mark_submitted(
        &self,
        id: RecordId,
        at: Timestamp,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        let row = OnboardingRecordRepo::mark_submitted(&self.pool, id, at)
            .await
            .map_err(map_db_error)?;
        into_optional(row)
    }

    async fn transition_status(
        &self,
        id: RecordId,
        from: OnboardingStatus,
        to: OnboardingStatus,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        from.validate_transition(to)?;
        let row = OnboardingRecordRepo::transition_status(&self.pool, id, from, to)
            .await
            .map_err(map_db_error)?;
        into_optional(row)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(map_db_error)
    }
}
