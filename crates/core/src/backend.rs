//! The wizard's view of the server.
//!
//! [`WizardBackend`] is what the Step Controller and Auto-Save Engine talk
//! to. [`LocalBackend`] runs against a [`RecordStore`] in the same process;
//! the REST client crate provides one that goes over HTTP.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::navigation::WizardPosition;
use crate::record::{OnboardingRecord, PatchOutcome};
use crate::slices::SliceName;
use crate::store::RecordStore;
use crate::submit::SubmitGuard;
use crate::types::{JsonMap, RecordId};

#[async_trait]
pub trait WizardBackend: Send + Sync + 'static {
    /// Read the whole record.
    async fn load(&self, id: RecordId) -> Result<OnboardingRecord, CoreError>;

    /// Persist one slice snapshot tagged with a per-slice sequence number.
    async fn save_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: i64,
    ) -> Result<PatchOutcome, CoreError>;

    /// Tell the server the wizard advanced from `from`. Returns the new
    /// position.
    async fn record_advance(
        &self,
        id: RecordId,
        from: WizardPosition,
    ) -> Result<WizardPosition, CoreError>;

    /// Run the Submit Guard.
    async fn submit(&self, id: RecordId) -> Result<OnboardingRecord, CoreError>;
}

/// Record that the wizard advanced from `from`.
///
/// `from` must already have been reached. Raises `furthest_step` to the
/// position after `from` and returns that position.
pub async fn advance_progress(
    store: &dyn RecordStore,
    id: RecordId,
    from: WizardPosition,
) -> Result<WizardPosition, CoreError> {
    let record = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| CoreError::record_not_found(id))?;

    if from.ordinal() > record.furthest_step {
        return Err(CoreError::StepNotReached {
            requested: from.token(),
            furthest: record.furthest_position().token(),
        });
    }

    let next = from.next()?;
    store
        .record_progress(id, next.ordinal())
        .await?
        .ok_or_else(|| CoreError::record_not_found(id))?;

    tracing::debug!(record_id = %id, from = %from, to = %next, "Wizard progress recorded");
    Ok(next)
}

/// In-process backend over a [`RecordStore`].
#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<dyn RecordStore>,
    guard: SubmitGuard,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn RecordStore>, guard: SubmitGuard) -> Self {
        Self { store, guard }
    }
}

#[async_trait]
impl WizardBackend for LocalBackend {
    async fn load(&self, id: RecordId) -> Result<OnboardingRecord, CoreError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::record_not_found(id))
    }

    async fn save_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: i64,
    ) -> Result<PatchOutcome, CoreError> {
        self.store
            .patch_slice(id, slice, fields, Some(seq))
            .await?
            .ok_or_else(|| CoreError::record_not_found(id))
    }

    async fn record_advance(
        &self,
        id: RecordId,
        from: WizardPosition,
    ) -> Result<WizardPosition, CoreError> {
        advance_progress(self.store.as_ref(), id, from).await
    }

    async fn submit(&self, id: RecordId) -> Result<OnboardingRecord, CoreError> {
        self.guard.submit(id).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::store::InMemoryRecordStore;
    use crate::submit::NoopNotifier;

    #[tokio::test]
    async fn advance_raises_furthest() {
        let store = Arc::new(InMemoryRecordStore::new());
        let record = store.create(1).await.unwrap();

        let next = advance_progress(store.as_ref(), record.id, WizardPosition::Step(1))
            .await
            .unwrap();
        assert_eq!(next, WizardPosition::Step(2));
        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.furthest_step, 2);
    }

    #[tokio::test]
    async fn advance_from_unreached_step_is_rejected() {
        let store = Arc::new(InMemoryRecordStore::new());
        let record = store.create(1).await.unwrap();

        assert_matches!(
            advance_progress(store.as_ref(), record.id, WizardPosition::Step(4)).await,
            Err(CoreError::StepNotReached { .. })
        );
    }

    #[tokio::test]
    async fn local_backend_save_and_load() {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let guard = SubmitGuard::new(store.clone(), Arc::new(NoopNotifier));
        let backend = LocalBackend::new(store.clone(), guard);
        let record = store.create(1).await.unwrap();

        let mut fields = JsonMap::new();
        fields.insert("name".into(), "Bella Napoli".into());
        let outcome = backend
            .save_slice(record.id, SliceName::RestaurantInfo, fields, 1)
            .await
            .unwrap();
        assert!(outcome.applied);

        let loaded = backend.load(record.id).await.unwrap();
        assert_eq!(loaded.slice(SliceName::RestaurantInfo)["name"], "Bella Napoli");
        assert_matches!(
            backend.load(uuid::Uuid::now_v7()).await,
            Err(CoreError::NotFound { .. })
        );
    }
}
