use std::collections::BTreeMap;

use crate::types::RecordId;

/// Per-field validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Validation failed for {} field(s)", .0.len())]
    FieldValidation(FieldErrors),

    #[error("Onboarding {id} has already been submitted")]
    AlreadySubmitted { id: RecordId },

    #[error("Step '{requested}' has not been reached yet (furthest: '{furthest}')")]
    StepNotReached { requested: String, furthest: String },

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The onboarding record `id` does not resolve.
    pub fn record_not_found(id: RecordId) -> Self {
        Self::NotFound {
            entity: "OnboardingRecord",
            id: id.to_string(),
        }
    }

    /// Whether repeating the same call may succeed. Only storage and
    /// transport failures qualify; a rejected write stays rejected.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
