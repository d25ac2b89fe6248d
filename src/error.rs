use std::fmt;

use crate::form::FormError;

/// Boxed error type used for body and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while gating a request.
///
/// Only [`Error::Validation`] is an expected outcome: the gate converts it
/// into [`ValidationOutcome::Invalid`](crate::ValidationOutcome::Invalid) and
/// the pipeline continues. Every other variant is an infrastructure failure
/// and propagates to the caller of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The antiforgery token pair was missing, malformed or did not correlate.
    #[error("antiforgery validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The request form could not be read within its configured limits.
    #[error("request form could not be read: {0}")]
    Form(#[from] FormError),

    /// The request body stream failed while being read.
    #[error("request body could not be read: {0}")]
    Body(#[source] BoxError),

    /// The token verification subsystem could not be reached.
    #[error("antiforgery token verification unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Returns `true` if this is a validation failure rather than an
    /// infrastructure fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// A failed antiforgery validation with details about what failed.
///
/// The message is meant for diagnostics. It names the cookie, form field or
/// header that was involved but never contains token material.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{ValidationError, ValidationFailureKind};
///
/// let err = ValidationError::new(ValidationFailureKind::TokenMismatch, "tokens do not match");
/// assert_eq!(err.kind(), ValidationFailureKind::TokenMismatch);
/// assert_eq!(err.to_string(), "token mismatch: tokens do not match");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    kind: ValidationFailureKind,
    message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(kind: ValidationFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error for a request that carries no antiforgery cookie.
    pub fn missing_cookie(cookie_name: &str) -> Self {
        Self::new(
            ValidationFailureKind::MissingCookieToken,
            format!("The required antiforgery cookie \"{cookie_name}\" is not present."),
        )
    }

    /// Error for a request that carries no request token in the form or header.
    pub fn missing_request_token(form_field_name: &str, header_name: Option<&str>) -> Self {
        let message = match header_name {
            Some(header) => format!(
                "The required antiforgery request token was not provided in either form field \"{form_field_name}\" or header value \"{header}\"."
            ),
            None => format!(
                "The required antiforgery form field \"{form_field_name}\" is not present."
            ),
        };
        Self::new(ValidationFailureKind::MissingRequestToken, message)
    }

    /// Returns the failure kind.
    pub fn kind(&self) -> ValidationFailureKind {
        self.kind
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The kind of antiforgery validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationFailureKind {
    /// The antiforgery cookie is absent
    MissingCookieToken,
    /// Neither the form field nor the header carried a request token
    MissingRequestToken,
    /// Both tokens are present but do not correlate
    TokenMismatch,
    /// A token could not be decoded
    MalformedToken,
    /// The token pair is no longer valid
    Expired,
    /// The request token was issued for a different user
    PrincipalMismatch,
}

impl ValidationFailureKind {
    /// Returns `true` for failures caused by an absent token.
    pub fn is_missing_token(self) -> bool {
        matches!(
            self,
            ValidationFailureKind::MissingCookieToken | ValidationFailureKind::MissingRequestToken
        )
    }
}

impl fmt::Display for ValidationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailureKind::MissingCookieToken => write!(f, "missing cookie token"),
            ValidationFailureKind::MissingRequestToken => write!(f, "missing request token"),
            ValidationFailureKind::TokenMismatch => write!(f, "token mismatch"),
            ValidationFailureKind::MalformedToken => write!(f, "malformed token"),
            ValidationFailureKind::Expired => write!(f, "expired token"),
            ValidationFailureKind::PrincipalMismatch => write!(f, "principal mismatch"),
        }
    }
}
