//! The antiforgery verdict recorded for a request.
//!
//! The slot is empty until the gate concludes. Downstream stages must treat
//! an empty slot as "not validated", never as success.

use crate::error::ValidationError;

/// Result of antiforgery validation for one request.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{ValidationError, ValidationFailureKind, ValidationOutcome};
///
/// assert!(ValidationOutcome::Valid.is_valid());
///
/// let invalid = ValidationOutcome::Invalid(ValidationError::missing_cookie(".Antiforgery"));
/// assert!(!invalid.is_valid());
/// assert_eq!(invalid.error().unwrap().kind(), ValidationFailureKind::MissingCookieToken);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The token pair was present and correlated
    Valid,
    /// Validation failed for the given reason
    Invalid(ValidationError),
}

impl ValidationOutcome {
    /// Returns `true` for [`ValidationOutcome::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// Returns the failure reason for [`ValidationOutcome::Invalid`].
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(err) => Some(err),
        }
    }
}

impl From<Result<(), ValidationError>> for ValidationOutcome {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Valid,
            Err(err) => ValidationOutcome::Invalid(err),
        }
    }
}

/// Write-once holder for a request's [`ValidationOutcome`].
#[derive(Debug, Default)]
pub struct OutcomeSlot {
    outcome: Option<ValidationOutcome>,
}

impl OutcomeSlot {
    /// Returns the recorded outcome, if any.
    pub fn get(&self) -> Option<&ValidationOutcome> {
        self.outcome.as_ref()
    }

    /// Returns `true` once an outcome has been recorded.
    pub fn is_set(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records `outcome` unless one is already present.
    ///
    /// On a second write the first outcome is kept and the rejected one is
    /// handed back.
    pub(crate) fn set(&mut self, outcome: ValidationOutcome) -> Result<(), ValidationOutcome> {
        if self.outcome.is_some() {
            return Err(outcome);
        }
        self.outcome = Some(outcome);
        Ok(())
    }
}
