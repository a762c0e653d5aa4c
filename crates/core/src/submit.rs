//! Submit Guard and post-submission status transitions.
//!
//! The guard reads the record fresh from the store, refuses anything that is
//! not a draft, and flips `draft -> submitted` with a compare-and-set so two
//! concurrent submits cannot both win. The notification that follows is
//! advisory: it runs on its own task and its failure is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::CoreError;
use crate::record::OnboardingRecord;
use crate::status::OnboardingStatus;
use crate::store::RecordStore;
use crate::types::RecordId;

/// Best-effort side effect fired after a successful submit.
#[async_trait]
pub trait SubmissionNotifier: Send + Sync {
    async fn submission_received(&self, record: &OnboardingRecord) -> Result<(), CoreError>;
}

/// A notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl SubmissionNotifier for NoopNotifier {
    async fn submission_received(&self, _record: &OnboardingRecord) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Enforces the single-submission invariant.
#[derive(Clone)]
pub struct SubmitGuard {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn SubmissionNotifier>,
}

impl SubmitGuard {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn SubmissionNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Submit the record `id`.
    ///
    /// Returns the submitted record once the store has acknowledged the
    /// status and timestamp write. Fails with [`CoreError::AlreadySubmitted`]
    /// when the record is no longer a draft, including when a concurrent
    /// submit won the compare-and-set.
    pub async fn submit(&self, id: RecordId) -> Result<OnboardingRecord, CoreError> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::record_not_found(id))?;

        if current.status != OnboardingStatus::Draft {
            tracing::info!(record_id = %id, status = %current.status, "Submit refused: already submitted");
            return Err(CoreError::AlreadySubmitted { id });
        }

        let submitted = self
            .store
            .mark_submitted(id, Utc::now())
            .await?
            .ok_or(CoreError::AlreadySubmitted { id })?;

        tracing::info!(
            record_id = %id,
            owner_id = submitted.owner_id,
            "Onboarding submitted",
        );

        let notifier = Arc::clone(&self.notifier);
        let snapshot = submitted.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.submission_received(&snapshot).await {
                tracing::warn!(record_id = %snapshot.id, error = %e, "Submission notification failed");
            }
        });

        Ok(submitted)
    }

    /// Move a submitted record one step along the review lifecycle.
    ///
    /// `to == Submitted` is routed through [`submit`](Self::submit).
    pub async fn transition(
        &self,
        id: RecordId,
        to: OnboardingStatus,
    ) -> Result<OnboardingRecord, CoreError> {
        if to == OnboardingStatus::Submitted {
            return self.submit(id).await;
        }

        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::record_not_found(id))?;
        current.status.validate_transition(to)?;

        let updated = self
            .store
            .transition_status(id, current.status, to)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Onboarding {id} changed status while moving to '{to}'"
                ))
            })?;

        tracing::info!(record_id = %id, from = %current.status, to = %to, "Onboarding status changed");
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
