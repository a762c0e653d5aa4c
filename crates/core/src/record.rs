//! The onboarding record aggregate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::navigation::WizardPosition;
use crate::slices::{merge_fields, SliceName, SliceSet};
use crate::status::OnboardingStatus;
use crate::types::{DbId, JsonMap, RecordId, Timestamp};

/// One onboarding submission in progress (or already submitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: RecordId,
    pub owner_id: DbId,
    pub status: OnboardingStatus,
    /// Ordinal of the furthest wizard position reached (see
    /// [`WizardPosition::ordinal`]). Never decreases.
    pub furthest_step: u8,
    #[serde(flatten)]
    pub slices: SliceSet,
    /// Sequence number of the last applied write, per slice key.
    #[serde(default)]
    pub slice_versions: BTreeMap<String, i64>,
    pub submitted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of a slice patch.
///
/// `applied` is `false` when the write carried a sequence number lower than
/// the last one applied to that slice; the record is returned unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub applied: bool,
    pub record: OnboardingRecord,
}

impl OnboardingRecord {
    /// A fresh draft with empty slices, positioned on step 1.
    pub fn new_draft(id: RecordId, owner_id: DbId, now: Timestamp) -> Self {
        Self {
            id,
            owner_id,
            status: OnboardingStatus::Draft,
            furthest_step: WizardPosition::first().ordinal(),
            slices: SliceSet::default(),
            slice_versions: BTreeMap::new(),
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slice(&self, slice: SliceName) -> &JsonMap {
        self.slices.get(slice)
    }

    pub fn slice_version(&self, slice: SliceName) -> Option<i64> {
        self.slice_versions.get(slice.key()).copied()
    }

    /// Whether `user_id` may see this record. Admins see everything.
    pub fn is_visible_to(&self, user_id: DbId, is_admin: bool) -> bool {
        is_admin || self.owner_id == user_id
    }

    /// The furthest wizard position reached so far.
    pub fn furthest_position(&self) -> WizardPosition {
        WizardPosition::from_ordinal(self.furthest_step).unwrap_or_else(|_| WizardPosition::first())
    }

    /// Shallow-merge `fields` into one slice.
    ///
    /// With a sequence number, the write is discarded when it is lower than
    /// the last applied one for the slice. Returns whether it was applied.
    pub fn apply_slice_patch(
        &mut self,
        slice: SliceName,
        fields: JsonMap,
        seq: Option<i64>,
        now: Timestamp,
    ) -> bool {
        if let (Some(seq), Some(last)) = (seq, self.slice_version(slice)) {
            if seq < last {
                return false;
            }
        }
        merge_fields(self.slices.get_mut(slice), fields);
        if let Some(seq) = seq {
            self.slice_versions.insert(slice.key().to_string(), seq);
        }
        self.updated_at = now;
        true
    }

    /// Record that the wizard reached the position with `ordinal`.
    pub fn reach(&mut self, ordinal: u8, now: Timestamp) {
        if ordinal > self.furthest_step {
            self.furthest_step = ordinal;
            self.updated_at = now;
        }
    }

    /// Flip `draft -> submitted` and stamp `submitted_at`.
    pub fn mark_submitted(&mut self, at: Timestamp) -> Result<(), CoreError> {
        if self.status != OnboardingStatus::Draft {
            return Err(CoreError::AlreadySubmitted { id: self.id });
        }
        self.status = OnboardingStatus::Submitted;
        self.submitted_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Move along the post-submission lifecycle (`in_review`, `completed`).
    pub fn transition(&mut self, to: OnboardingStatus, now: Timestamp) -> Result<(), CoreError> {
        if to == OnboardingStatus::Submitted {
            return self.mark_submitted(now);
        }
        self.status.validate_transition(to)?;
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Patch bodies
// ---------------------------------------------------------------------------

/// A parsed `PATCH /onboarding/{id}` body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// Slice writes, in body order.
    pub slices: Vec<(SliceName, JsonMap)>,
    /// Requested status change, if any.
    pub status: Option<OnboardingStatus>,
}

impl RecordPatch {
    /// Key carrying a status change.
    pub const STATUS_KEY: &'static str = "status";
    /// Key the server ignores: it stamps `submittedAt` itself.
    pub const SUBMITTED_AT_KEY: &'static str = "submittedAt";

    /// Parse a JSON object body.
    ///
    /// Every key must be a slice name, `status`, or `submittedAt`, and every
    /// slice value must itself be an object.
    pub fn from_body(body: JsonMap) -> Result<Self, CoreError> {
        let mut patch = RecordPatch::default();
        for (key, value) in body {
            if key == Self::STATUS_KEY {
                let raw = value.as_str().ok_or_else(|| {
                    CoreError::Validation("'status' must be a string".to_string())
                })?;
                patch.status = Some(OnboardingStatus::from_str_db(raw)?);
                continue;
            }
            if key == Self::SUBMITTED_AT_KEY {
                continue;
            }
            let slice = SliceName::from_key(&key).ok_or_else(|| {
                CoreError::Validation(format!("Unknown onboarding field '{key}'"))
            })?;
            match value {
                serde_json::Value::Object(fields) => patch.slices.push((slice, fields)),
                _ => {
                    return Err(CoreError::Validation(format!(
                        "'{key}' must be a JSON object"
                    )))
                }
            }
        }
        if patch.slices.is_empty() && patch.status.is_none() {
            return Err(CoreError::Validation(
                "Patch body must contain at least one slice or a status".to_string(),
            ));
        }
        Ok(patch)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
