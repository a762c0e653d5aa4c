//! Wizard navigation state machine.
//!
//! States are the numbered steps `1..=T`, the summary, and the terminal
//! `Submitted` state. The navigator tracks the furthest position reached so
//! far; jumps are only allowed backwards from it.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slices::SliceName;
use crate::steps::{MAX_STEP, MIN_STEP, TOTAL_STEPS};

/// Route token for the summary view.
pub const SUMMARY_TOKEN: &str = "summary";

/// Route token for the terminal submitted state.
pub const SUBMITTED_TOKEN: &str = "submitted";

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A state of the wizard's navigation machine.
///
/// Serialized as its route token: `"1"`..`"7"`, `"summary"`, `"submitted"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WizardPosition {
    Step(u8),
    Summary,
    Submitted,
}

impl WizardPosition {
    /// Step 1, where every wizard session starts.
    pub fn first() -> Self {
        Self::Step(MIN_STEP)
    }

    /// Parse a route token. Only numbered steps and the summary are
    /// addressable; anything else is invalid.
    pub fn parse_token(token: &str) -> Result<Self, CoreError> {
        if token == SUMMARY_TOKEN {
            return Ok(Self::Summary);
        }
        let n: u8 = token.parse().map_err(|_| {
            CoreError::Validation(format!(
                "Invalid step '{token}'. Must be a number between {MIN_STEP} and {MAX_STEP} or '{SUMMARY_TOKEN}'"
            ))
        })?;
        Self::step(n)
    }

    /// A numbered step, checked against the step range.
    pub fn step(n: u8) -> Result<Self, CoreError> {
        if !(MIN_STEP..=MAX_STEP).contains(&n) {
            return Err(CoreError::Validation(format!(
                "Step {n} is out of range ({MIN_STEP}..{MAX_STEP})"
            )));
        }
        Ok(Self::Step(n))
    }

    /// Route token for this position.
    pub fn token(self) -> String {
        match self {
            Self::Step(n) => n.to_string(),
            Self::Summary => SUMMARY_TOKEN.to_string(),
            Self::Submitted => SUBMITTED_TOKEN.to_string(),
        }
    }

    /// Total order over positions: steps are `1..=T`, the summary `T+1`,
    /// submitted `T+2`.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Step(n) => n,
            Self::Summary => TOTAL_STEPS + 1,
            Self::Submitted => TOTAL_STEPS + 2,
        }
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    pub fn from_ordinal(n: u8) -> Result<Self, CoreError> {
        match n {
            n if n == TOTAL_STEPS + 1 => Ok(Self::Summary),
            n if n == TOTAL_STEPS + 2 => Ok(Self::Submitted),
            n => Self::step(n),
        }
    }

    /// Slice edited at this position (`None` for summary and submitted).
    pub fn slice(self) -> Option<SliceName> {
        match self {
            Self::Step(n) => SliceName::from_step(n).ok(),
            Self::Summary | Self::Submitted => None,
        }
    }

    /// Position reached by advancing. Step `T` advances to the summary;
    /// the summary only leaves through submit.
    pub fn next(self) -> Result<Self, CoreError> {
        match self {
            Self::Step(n) if n < MAX_STEP => Ok(Self::Step(n + 1)),
            Self::Step(_) => Ok(Self::Summary),
            Self::Summary => Err(CoreError::Validation(
                "The summary can only be left by submitting".to_string(),
            )),
            Self::Submitted => Err(CoreError::Validation(
                "The wizard has already been submitted".to_string(),
            )),
        }
    }

    /// Position reached by going back. A no-op on step 1 and once
    /// submitted.
    pub fn previous(self) -> Self {
        match self {
            Self::Step(n) if n > MIN_STEP => Self::Step(n - 1),
            Self::Step(n) => Self::Step(n),
            Self::Summary => Self::Step(MAX_STEP),
            Self::Submitted => Self::Submitted,
        }
    }
}

impl std::fmt::Display for WizardPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

impl From<WizardPosition> for String {
    fn from(position: WizardPosition) -> Self {
        position.token()
    }
}

impl TryFrom<String> for WizardPosition {
    type Error = CoreError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        if token == SUBMITTED_TOKEN {
            return Ok(Self::Submitted);
        }
        Self::parse_token(&token)
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// Current position plus the furthest position visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardNavigator {
    position: WizardPosition,
    furthest: u8,
}

impl Default for WizardNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardNavigator {
    /// A navigator on step 1 that has seen nothing else.
    pub fn new() -> Self {
        Self {
            position: WizardPosition::first(),
            furthest: WizardPosition::first().ordinal(),
        }
    }

    /// Resume at `position` given the furthest ordinal reached so far.
    ///
    /// Fails with [`CoreError::StepNotReached`] when `position` lies beyond
    /// it.
    pub fn resume(position: WizardPosition, furthest: u8) -> Result<Self, CoreError> {
        let furthest = furthest.max(WizardPosition::first().ordinal());
        let navigator = Self { position, furthest };
        navigator.check_reached(position)?;
        Ok(navigator)
    }

    pub fn position(&self) -> WizardPosition {
        self.position
    }

    /// Ordinal of the furthest position visited.
    pub fn furthest(&self) -> u8 {
        self.furthest
    }

    pub fn furthest_position(&self) -> WizardPosition {
        WizardPosition::from_ordinal(self.furthest).unwrap_or(self.position)
    }

    fn check_reached(&self, target: WizardPosition) -> Result<(), CoreError> {
        if target.ordinal() > self.furthest {
            return Err(CoreError::StepNotReached {
                requested: target.token(),
                furthest: self.furthest_position().token(),
            });
        }
        Ok(())
    }

    /// Move one position forward.
    pub fn advance(&mut self) -> Result<WizardPosition, CoreError> {
        let next = self.position.next()?;
        self.position = next;
        self.furthest = self.furthest.max(next.ordinal());
        Ok(next)
    }

    /// Move one position back (no-op on step 1).
    pub fn retreat(&mut self) -> WizardPosition {
        self.position = self.position.previous();
        self.position
    }

    /// Jump to an already visited position.
    pub fn jump_to(&mut self, target: WizardPosition) -> Result<WizardPosition, CoreError> {
        if self.position == WizardPosition::Submitted {
            return Err(CoreError::Validation(
                "The wizard has already been submitted".to_string(),
            ));
        }
        if target == WizardPosition::Submitted {
            return Err(CoreError::Validation(
                "Submitting requires the submit action".to_string(),
            ));
        }
        self.check_reached(target)?;
        self.position = target;
        Ok(target)
    }

    /// Enter the terminal state. Only legal from the summary.
    pub fn mark_submitted(&mut self) -> Result<(), CoreError> {
        if self.position != WizardPosition::Summary {
            return Err(CoreError::Validation(
                "Submit is only available from the summary".to_string(),
            ));
        }
        self.position = WizardPosition::Submitted;
        self.furthest = WizardPosition::Submitted.ordinal();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
