//! Onboarding record status lifecycle.
//!
//! `draft -> submitted -> in_review -> completed`, strictly forward and one
//! step at a time. The submit transition is only legal from `draft`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status values for an onboarding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Draft,
    Submitted,
    InReview,
    Completed,
}

impl OnboardingStatus {
    /// Every status in lifecycle order.
    pub const ALL: [OnboardingStatus; 4] = [
        Self::Draft,
        Self::Submitted,
        Self::InReview,
        Self::Completed,
    ];

    /// Parse a status string from the database or a request body.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "in_review" => Ok(Self::InReview),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid onboarding status '{s}'. Must be one of: draft, submitted, in_review, completed"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::InReview => "in_review",
            Self::Completed => "completed",
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Submitted),
            Self::Submitted => Some(Self::InReview),
            Self::InReview => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Validate a status transition.
    ///
    /// Only the single forward step returned by [`next`](Self::next) is
    /// allowed. Leaving `draft` by any route other than `submitted` is
    /// rejected, as is every backward move.
    pub fn validate_transition(self, to: Self) -> Result<(), CoreError> {
        if self.next() == Some(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// Whether `submitted_at` must be set for a record in this status.
    pub fn has_been_submitted(self) -> bool {
        self != Self::Draft
    }
}

impl std::fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
