//! Step Controller: drives one wizard session over a [`WizardBackend`].
//!
//! The controller owns the navigation state machine and one
//! [`AutoSaveEngine`] per visited step. Leaving a step keeps its engine
//! alive, so a pending write still lands and re-entering the step shows the
//! latest local edits.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::autosave::{AutoSaveConfig, AutoSaveEngine, SaveStatus};
use crate::backend::WizardBackend;
use crate::error::CoreError;
use crate::navigation::{WizardNavigator, WizardPosition};
use crate::record::OnboardingRecord;
use crate::slices::SliceName;
use crate::steps::{self, RequiredField};
use crate::types::{JsonMap, RecordId};

// ---------------------------------------------------------------------------
// Step view
// ---------------------------------------------------------------------------

/// What a client needs to render one wizard position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub record_id: RecordId,
    pub position: WizardPosition,
    pub total_steps: u8,
    pub furthest: WizardPosition,
    /// Slice edited at this position; `None` on the summary.
    pub slice: Option<SliceName>,
    pub label: &'static str,
    /// Slice data over its default template. Empty on the summary.
    pub data: JsonMap,
    pub required_fields: &'static [RequiredField],
    /// Route token of the previous position, if any.
    pub previous: Option<WizardPosition>,
    /// Route token of the next position, if any.
    pub next: Option<WizardPosition>,
    /// The full record, included on the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<OnboardingRecord>,
}

impl StepView {
    /// Build the view of `position` from a stored record.
    pub fn for_record(record: &OnboardingRecord, position: WizardPosition) -> Self {
        let slice = position.slice();
        let data = slice
            .map(|s| steps::with_defaults(s, record.slice(s)))
            .unwrap_or_default();
        Self::build(record, position, data)
    }

    fn build(record: &OnboardingRecord, position: WizardPosition, data: JsonMap) -> Self {
        let slice = position.slice();
        let previous = match position {
            WizardPosition::Step(1) | WizardPosition::Submitted => None,
            other => Some(other.previous()),
        };
        Self {
            record_id: record.id,
            position,
            total_steps: steps::TOTAL_STEPS,
            furthest: record.furthest_position(),
            slice,
            label: match (position, slice) {
                (_, Some(s)) => steps::label(s),
                (WizardPosition::Summary, None) => "Summary",
                _ => "Submitted",
            },
            data,
            required_fields: slice.map(steps::required_fields).unwrap_or(&[]),
            previous,
            next: match position {
                WizardPosition::Step(_) => position.next().ok(),
                _ => None,
            },
            record: slice.is_none().then(|| record.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct StepController {
    backend: Arc<dyn WizardBackend>,
    config: AutoSaveConfig,
    record: OnboardingRecord,
    navigator: WizardNavigator,
    engines: HashMap<SliceName, AutoSaveEngine>,
}

impl std::fmt::Debug for StepController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepController")
            .field("record_id", &self.record.id)
            .field("navigator", &self.navigator)
            .field("engines", &self.engines.len())
            .finish()
    }
}

impl StepController {
    /// Load record `id` and open `position`.
    ///
    /// Fails with [`CoreError::NotFound`] for an unknown id and with
    /// [`CoreError::StepNotReached`] when `position` lies beyond the
    /// furthest position the record has reached.
    pub async fn enter(
        backend: Arc<dyn WizardBackend>,
        id: RecordId,
        position: WizardPosition,
        config: AutoSaveConfig,
    ) -> Result<Self, CoreError> {
        let record = backend.load(id).await?;
        let navigator = WizardNavigator::resume(position, record.furthest_step)?;

        let mut controller = Self {
            backend,
            config,
            record,
            navigator,
            engines: HashMap::new(),
        };
        controller.open_current(false).await?;

        tracing::debug!(record_id = %id, position = %position, "Wizard entered");
        Ok(controller)
    }

    pub fn record_id(&self) -> RecordId {
        self.record.id
    }

    pub fn position(&self) -> WizardPosition {
        self.navigator.position()
    }

    pub fn furthest(&self) -> WizardPosition {
        self.navigator.furthest_position()
    }

    /// The record as last read from the backend.
    pub fn record(&self) -> &OnboardingRecord {
        &self.record
    }

    fn current_engine(&self) -> Option<&AutoSaveEngine> {
        self.position()
            .slice()
            .and_then(|slice| self.engines.get(&slice))
    }

    /// Apply an edit to the current step's slice.
    pub fn update(&self, fields: JsonMap) -> Result<(), CoreError> {
        let engine = self.current_engine().ok_or_else(|| {
            CoreError::Validation(format!("No step is edited at '{}'", self.position()))
        })?;
        engine.update(fields);
        Ok(())
    }

    /// In-memory data of the current step, including unsaved edits.
    pub fn current_data(&self) -> Option<JsonMap> {
        self.current_engine().map(AutoSaveEngine::snapshot)
    }

    pub fn save_status(&self) -> Option<SaveStatus> {
        self.current_engine().map(AutoSaveEngine::status)
    }

    /// Whether any visited step holds edits that are not yet durable.
    pub fn has_unsaved_changes(&self) -> bool {
        self.engines.values().any(|e| e.status().unsaved_changes)
    }

    /// View of the current position built from local state.
    pub fn view(&self) -> StepView {
        let data = self.current_data().unwrap_or_default();
        StepView::build(&self.record, self.position(), data)
    }

    /// Check the current step's required fields without any I/O.
    pub fn validate_current(&self) -> Result<(), CoreError> {
        match (self.position().slice(), self.current_data()) {
            (Some(slice), Some(data)) => steps::validate_required(slice, &data),
            _ => Ok(()),
        }
    }

    /// Go to the next position.
    ///
    /// Refused locally with [`CoreError::FieldValidation`] when the current
    /// step has empty required fields. From step `T` this opens the
    /// summary.
    pub async fn advance(&mut self) -> Result<WizardPosition, CoreError> {
        self.validate_current()?;

        let from = self.position();
        let next = self.navigator.advance()?;
        if let Err(e) = self.backend.record_advance(self.record.id, from).await {
            tracing::warn!(record_id = %self.record.id, from = %from, error = %e, "Failed to record wizard progress");
        }
        self.record.reach(next.ordinal(), self.record.updated_at);

        self.open_current(true).await?;
        Ok(next)
    }

    /// Go to the previous position (no-op on step 1).
    pub async fn retreat(&mut self) -> Result<WizardPosition, CoreError> {
        let before = self.position();
        let position = self.navigator.retreat();
        if position != before {
            self.open_current(true).await?;
        }
        Ok(position)
    }

    /// Jump to a position already reached.
    pub async fn jump_to(&mut self, target: WizardPosition) -> Result<WizardPosition, CoreError> {
        let position = self.navigator.jump_to(target)?;
        self.open_current(true).await?;
        Ok(position)
    }

    /// Write every pending edit of every visited step now.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let results = futures::future::join_all(self.engines.values().map(|e| e.flush())).await;
        results.into_iter().collect()
    }

    /// Submit from the summary.
    ///
    /// Pending edits are flushed first; a failed flush aborts the submit.
    pub async fn submit(&mut self) -> Result<OnboardingRecord, CoreError> {
        if self.position() != WizardPosition::Summary {
            return Err(CoreError::Validation(
                "Submit is only available from the summary".to_string(),
            ));
        }
        self.flush().await?;

        let submitted = self.backend.submit(self.record.id).await?;
        self.navigator.mark_submitted()?;
        self.record = submitted.clone();

        tracing::info!(record_id = %self.record.id, "Wizard submitted");
        Ok(submitted)
    }

    /// Prepare local state for the current position.
    ///
    /// A step visited before keeps its engine. A new step is seeded from a
    /// fresh read merged over the step's defaults. The summary flushes and
    /// re-reads the whole record.
    async fn open_current(&mut self, reload: bool) -> Result<(), CoreError> {
        match self.position() {
            WizardPosition::Step(_) => {
                let Some(slice) = self.position().slice() else {
                    return Ok(());
                };
                if self.engines.contains_key(&slice) {
                    return Ok(());
                }
                if reload {
                    self.reload().await?;
                }
                let seed = steps::with_defaults(slice, self.record.slice(slice));
                let engine = AutoSaveEngine::spawn(
                    Arc::clone(&self.backend),
                    self.record.id,
                    slice,
                    seed,
                    self.config.clone(),
                );
                self.engines.insert(slice, engine);
            }
            WizardPosition::Summary => {
                if let Err(e) = self.flush().await {
                    tracing::warn!(record_id = %self.record.id, error = %e, "Summary opened with unsaved changes");
                }
                if reload {
                    self.reload().await?;
                }
            }
            WizardPosition::Submitted => {}
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), CoreError> {
        let furthest = self.record.furthest_step;
        self.record = self.backend.load(self.record.id).await?;
        self.record.furthest_step = self.record.furthest_step.max(furthest);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::backend::LocalBackend;
    use crate::status::OnboardingStatus;
    use crate::store::{InMemoryRecordStore, RecordStore};
    use crate::submit::{NoopNotifier, SubmitGuard};

    fn map(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (Arc<dyn WizardBackend>, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let guard = SubmitGuard::new(store.clone(), Arc::new(NoopNotifier));
        let backend: Arc<dyn WizardBackend> = Arc::new(LocalBackend::new(store.clone(), guard));
        (backend, store)
    }

    fn step_data(step: u8) -> JsonMap {
        match step {
            1 => map(json!({
                "name": "Bella Napoli",
                "street": "Via Roma 1",
                "zipCode": "80100",
                "city": "Napoli",
            })),
            2 => map(json!({
                "firstName": "Gina",
                "lastName": "Rossi",
                "email": "gina@bellanapoli.it",
                "phone": "+39 081 000",
            })),
            3 => map(json!({ "legalName": "Bella Napoli S.r.l.", "taxId": "IT123", "iban": "IT60X054" })),
            4 => map(json!({ "hasWifi": true })),
            5 => map(json!({ "indoorTables": 12 })),
            6 => map(json!({ "categories": ["Antipasti", "Pizze"] })),
            7 => map(json!({
                "signatoryName": "Gina Rossi",
                "signature": "data:image/png;base64,AAAA",
                "acceptedTerms": true,
            })),
            _ => JsonMap::new(),
        }
    }

    #[tokio::test]
    async fn enter_unknown_record_is_not_found() {
        let (backend, _store) = setup();
        let result = StepController::enter(
            backend,
            uuid::Uuid::now_v7(),
            WizardPosition::first(),
            AutoSaveConfig::default(),
        )
        .await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn enter_beyond_furthest_is_rejected() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let result =
            StepController::enter(backend, record.id, WizardPosition::Step(3), AutoSaveConfig::default())
                .await;
        assert_matches!(result, Err(CoreError::StepNotReached { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_step_shows_defaults_and_writes_nothing() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        store.record_progress(record.id, 5).await.unwrap();

        let controller =
            StepController::enter(backend, record.id, WizardPosition::Step(5), AutoSaveConfig::default())
                .await
                .unwrap();
        assert_eq!(
            controller.current_data().unwrap(),
            steps::defaults(SliceName::Tables)
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert!(stored.slice(SliceName::Tables).is_empty());
        assert!(stored.slice_versions.is_empty());
    }

    #[tokio::test]
    async fn advance_refused_locally_with_field_errors() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller =
            StepController::enter(backend, record.id, WizardPosition::first(), AutoSaveConfig::default())
                .await
                .unwrap();

        controller.update(map(json!({ "name": "Bella Napoli" }))).unwrap();
        assert_matches!(
            controller.advance().await,
            Err(CoreError::FieldValidation(fields)) => {
                assert!(fields.contains_key("street"));
                assert!(!fields.contains_key("name"));
            }
        );
        assert_eq!(controller.position(), WizardPosition::Step(1));

        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.furthest_step, 1);
    }

    #[tokio::test]
    async fn retreat_on_first_step_is_noop() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller =
            StepController::enter(backend, record.id, WizardPosition::first(), AutoSaveConfig::default())
                .await
                .unwrap();
        assert_eq!(controller.retreat().await.unwrap(), WizardPosition::Step(1));
    }

    #[tokio::test]
    async fn jump_forward_past_furthest_is_rejected() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller =
            StepController::enter(backend, record.id, WizardPosition::first(), AutoSaveConfig::default())
                .await
                .unwrap();

        controller.update(step_data(1)).unwrap();
        controller.advance().await.unwrap();
        assert_matches!(
            controller.jump_to(WizardPosition::Step(4)).await,
            Err(CoreError::StepNotReached { .. })
        );
        assert_eq!(controller.jump_to(WizardPosition::Step(1)).await.unwrap(), WizardPosition::Step(1));
    }

    #[tokio::test(start_paused = true)]
    async fn revisiting_a_step_keeps_unsaved_edits() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller =
            StepController::enter(backend, record.id, WizardPosition::first(), AutoSaveConfig::default())
                .await
                .unwrap();

        controller.update(step_data(1)).unwrap();
        controller.advance().await.unwrap();
        controller.retreat().await.unwrap();

        // Still inside the debounce window: nothing written yet.
        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert!(stored.slice(SliceName::RestaurantInfo).is_empty());
        assert_eq!(controller.current_data().unwrap()["name"], "Bella Napoli");

        // Navigation did not cancel the pending write.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.slice(SliceName::RestaurantInfo)["name"], "Bella Napoli");
    }

    #[tokio::test]
    async fn update_on_summary_is_rejected() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        store.record_progress(record.id, 8).await.unwrap();
        let controller =
            StepController::enter(backend, record.id, WizardPosition::Summary, AutoSaveConfig::default())
                .await
                .unwrap();
        assert!(controller.update(JsonMap::new()).is_err());
        assert!(controller.view().record.is_some());
    }

    #[tokio::test]
    async fn submit_requires_summary() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller =
            StepController::enter(backend, record.id, WizardPosition::first(), AutoSaveConfig::default())
                .await
                .unwrap();
        assert_matches!(controller.submit().await, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn full_wizard_walkthrough() {
        let (backend, store) = setup();
        let record = store.create(1).await.unwrap();
        let mut controller = StepController::enter(
            backend.clone(),
            record.id,
            WizardPosition::first(),
            AutoSaveConfig::default(),
        )
        .await
        .unwrap();

        for step in 1..=steps::TOTAL_STEPS {
            assert_eq!(controller.position(), WizardPosition::Step(step));
            controller.update(step_data(step)).unwrap();
            controller.advance().await.unwrap();
        }
        assert_eq!(controller.position(), WizardPosition::Summary);

        // The summary flushed every step and re-read the record.
        let summary = controller.record().clone();
        assert_eq!(summary.slice(SliceName::RestaurantInfo)["name"], "Bella Napoli");
        assert_eq!(summary.slice(SliceName::Tables)["indoorTables"], 12);
        assert_eq!(summary.furthest_step, 8);

        let submitted = controller.submit().await.unwrap();
        assert_eq!(submitted.status, OnboardingStatus::Submitted);
        assert!(submitted.submitted_at.is_some());
        assert_eq!(controller.position(), WizardPosition::Submitted);

        // A second session on the same record cannot submit again.
        let mut second =
            StepController::enter(backend, record.id, WizardPosition::Summary, AutoSaveConfig::default())
                .await
                .unwrap();
        assert_matches!(second.submit().await, Err(CoreError::AlreadySubmitted { .. }));

        let stored = store.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.submitted_at, submitted.submitted_at);
    }
}
