//! Record Store: persistence seam for onboarding records.
//!
//! Every write touches a single slice or a single status field. Handlers and
//! the wizard only ever hold an `Arc<dyn RecordStore>`, so the Postgres
//! implementation in `bistro-db` and the in-memory one below are
//! interchangeable.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::record::{OnboardingRecord, PatchOutcome};
use crate::slices::SliceName;
use crate::status::OnboardingStatus;
use crate::types::{DbId, JsonMap, RecordId, Timestamp};

/// Filter for [`RecordStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only records owned by this user.
    pub owner_id: Option<DbId>,
    /// Only records in this status.
    pub status: Option<OnboardingStatus>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a fresh draft owned by `owner_id`.
    async fn create(&self, owner_id: DbId) -> Result<OnboardingRecord, CoreError>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<OnboardingRecord>, CoreError>;

    /// Records matching `filter`, newest first.
    async fn list(
        &self,
        filter: ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnboardingRecord>, CoreError>;

    /// Shallow-merge `fields` into one slice. Other slices are untouched.
    ///
    /// A write whose `seq` is lower than the last applied one for the slice
    /// is discarded (`applied == false`). `None` when the record is missing.
    async fn patch_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: Option<i64>,
    ) -> Result<Option<PatchOutcome>, CoreError>;

    /// Raise `furthest_step` to `ordinal` if it is lower.
    async fn record_progress(
        &self,
        id: RecordId,
        ordinal: u8,
    ) -> Result<Option<OnboardingRecord>, CoreError>;

    /// Compare-and-set `draft -> submitted`, stamping `submitted_at`.
    ///
    /// `None` when the record is missing or no longer a draft.
    async fn mark_submitted(
        &self,
        id: RecordId,
        at: Timestamp,
    ) -> Result<Option<OnboardingRecord>, CoreError>;

    /// Compare-and-set `from -> to` for the review lifecycle.
    async fn transition_status(
        &self,
        id: RecordId,
        from: OnboardingStatus,
        to: OnboardingStatus,
    ) -> Result<Option<OnboardingRecord>, CoreError>;

    async fn health_check(&self) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A [`RecordStore`] held in process memory.
///
/// Used by tests and by local runs without a database. Writes take the lock
/// for the whole read-modify-write, so each call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, OnboardingRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, owner_id: DbId) -> Result<OnboardingRecord, CoreError> {
        let record = OnboardingRecord::new_draft(uuid::Uuid::now_v7(), owner_id, Utc::now());
        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<OnboardingRecord>, CoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnboardingRecord>, CoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<OnboardingRecord> = records
            .values()
            .filter(|r| filter.owner_id.map_or(true, |owner| r.owner_id == owner))
            .filter(|r| filter.status.map_or(true, |status| r.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn patch_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: Option<i64>,
    ) -> Result<Option<PatchOutcome>, CoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        let applied = record.apply_slice_patch(slice, fields, seq, Utc::now());
        Ok(Some(PatchOutcome {
            applied,
            record: record.clone(),
        }))
    }

    async fn record_progress(
        &self,
        id: RecordId,
        ordinal: u8,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(&id).map(|record| {
            record.reach(ordinal, Utc::now());
            record.clone()
        }))
    }

    async fn mark_submitted(
        &self,
        id: RecordId,
        at: Timestamp,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        Ok(record.mark_submitted(at).ok().map(|()| record.clone()))
    }

    async fn transition_status(
        &self,
        id: RecordId,
        from: OnboardingStatus,
        to: OnboardingStatus,
    ) -> Result<Option<OnboardingRecord>, CoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != from {
            return Ok(None);
        }
        record.transition(to, Utc::now())?;
        Ok(Some(record.clone()))
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
