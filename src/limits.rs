//! Installation of per-route form limits.

use crate::context::RequestContext;
use crate::form::{FormLimitsOverride, FormOptions};
use crate::logging::GateLog;

/// What [`apply_limits`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitsApplication {
    /// The form was already being read; nothing changed
    AlreadyRead,
    /// The route declares no limits; nothing changed
    NotConfigured,
    /// The route's limits were installed
    Applied,
}

/// Installs the route's form limits before anything reads the body.
///
/// Once form reading has begun the request is left alone and a warning is
/// logged. Applying the same override again leaves the same options
/// installed.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{apply_limits, FormLimitsOverride, LimitsApplication, RequestContext};
///
/// let mut ctx = RequestContext::from_request(http::Request::post("/upload").body(()).unwrap());
/// let limits = FormLimitsOverride { value_count_limit: 10, ..Default::default() };
///
/// assert_eq!(apply_limits(&mut ctx, None), LimitsApplication::NotConfigured);
/// assert_eq!(apply_limits(&mut ctx, Some(&limits)), LimitsApplication::Applied);
/// assert_eq!(ctx.form_options().unwrap().value_count_limit, 10);
/// ```
pub fn apply_limits<B>(
    ctx: &mut RequestContext<B>,
    limits: Option<&FormLimitsOverride>,
) -> LimitsApplication {
    if ctx.form_feature().has_begun_reading() {
        GateLog::new(ctx.request_id()).cannot_apply_request_form_limits();
        return LimitsApplication::AlreadyRead;
    }

    let Some(limits) = limits else {
        return LimitsApplication::NotConfigured;
    };

    ctx.form_feature_mut().install_options(FormOptions::from(limits));
    GateLog::new(ctx.request_id()).applied_request_form_limits();
    LimitsApplication::Applied
}
