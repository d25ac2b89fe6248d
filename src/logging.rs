//! Structured diagnostic events.

/// Diagnostic events emitted while gating a request.
///
/// `GateLog` is borrowed from a request's id and tags every event with it,
/// together with a stable `event_id` and `event_name` so log pipelines can
/// match on events without parsing messages.
///
/// Events never carry token material or form values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GateLog<'a> {
    request_id: &'a str,
}

/// Stable identifiers for gate events.
pub mod event {
    /// Form options could not be applied because reading had begun.
    pub const CANNOT_APPLY_REQUEST_FORM_LIMITS: (u32, &str) = (1, "CannotApplyRequestFormLimits");
    /// Form options were installed for the request.
    pub const APPLIED_REQUEST_FORM_LIMITS: (u32, &str) = (2, "AppliedRequestFormLimits");
}

impl<'a> GateLog<'a> {
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Warning: limits arrived after the form was already being read.
    pub(crate) fn cannot_apply_request_form_limits(&self) {
        let (event_id, event_name) = event::CANNOT_APPLY_REQUEST_FORM_LIMITS;
        tracing::warn!(
            request_id = %self.request_id,
            event_id,
            event_name,
            "Unable to apply configured form options since the request form has already been read."
        );
    }

    /// Trace: limits were installed.
    pub(crate) fn applied_request_form_limits(&self) {
        let (event_id, event_name) = event::APPLIED_REQUEST_FORM_LIMITS;
        tracing::trace!(
            request_id = %self.request_id,
            event_id,
            event_name,
            "Applied the configured form options on the current request."
        );
    }
}
