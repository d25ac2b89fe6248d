use tracing::Instrument;

use crate::{
    context::RequestContext,
    error::Error,
    limits::{self, LimitsApplication},
    method,
    outcome::ValidationOutcome,
    policy,
    validator::TokenValidator,
};

/// What the gate decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// An earlier gate already recorded an outcome
    AlreadyConcluded,
    /// The method cannot carry a form
    SkippedSafeMethod,
    /// No endpoint matched, or the endpoint does not require validation
    SkippedNotRequired,
    /// The validator ran and an outcome was recorded
    Validated {
        /// Whether the recorded outcome is `Valid`
        valid: bool,
        /// What happened to the route's form limits
        limits: LimitsApplication,
    },
}

/// The antiforgery enforcement gate.
///
/// The gate decides whether a request needs validation, installs the
/// route's form limits, runs the validator and records its verdict on the
/// request. It never rejects a request itself; downstream stages read the
/// verdict through [`RequestContext::antiforgery_outcome`].
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{
///     AntiforgeryGate, Endpoint, Error, GateDecision, RequestContext, RequireAntiforgeryToken,
///     RouteMetadata, TokenValidator,
/// };
/// use async_trait::async_trait;
///
/// struct AlwaysValid;
///
/// #[async_trait]
/// impl<B: Send + 'static> TokenValidator<B> for AlwaysValid {
///     async fn validate(&self, _ctx: &mut RequestContext<B>) -> Result<(), Error> {
///         Ok(())
///     }
/// }
///
/// # futures_util::future::FutureExt::now_or_never(async {
/// let gate = AntiforgeryGate::new(AlwaysValid);
/// let endpoint = Endpoint::new("GET /todos", RouteMetadata::new().with(RequireAntiforgeryToken));
///
/// let mut ctx = RequestContext::from_request(http::Request::get("/todos").body(()).unwrap())
///     .with_endpoint(endpoint.shared());
///
/// let decision = gate.evaluate(&mut ctx).await.unwrap();
/// assert_eq!(decision, GateDecision::SkippedSafeMethod);
/// assert!(ctx.antiforgery_outcome().is_none());
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct AntiforgeryGate<V> {
    validator: V,
}

impl<V> AntiforgeryGate<V> {
    /// Creates a gate that validates with `validator`.
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    /// Returns the validator used by this gate.
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Runs the gate against one request.
    ///
    /// Only a safe method, an unmatched endpoint or an endpoint without a
    /// requirement skips validation. A request that an earlier gate already
    /// concluded is passed through untouched. Otherwise exactly one outcome
    /// is recorded before this future resolves.
    ///
    /// # Errors
    ///
    /// Any validator error other than [`Error::Validation`] is returned as
    /// is and no outcome is recorded. Dropping the future before it resolves
    /// also leaves the outcome unrecorded.
    pub async fn evaluate<B>(&self, ctx: &mut RequestContext<B>) -> Result<GateDecision, Error>
    where
        B: Send + 'static,
        V: TokenValidator<B>,
    {
        if ctx.endpoint().is_some() {
            ctx.mark_antiforgery_considered();
        }

        if ctx.antiforgery_outcome().is_some() {
            return Ok(GateDecision::AlreadyConcluded);
        }

        if !method::is_form_bearing(ctx.method()) {
            return Ok(GateDecision::SkippedSafeMethod);
        }

        if !policy::requires_validation(ctx.route_metadata()) {
            return Ok(GateDecision::SkippedNotRequired);
        }

        let route_limits = ctx.route_metadata().and_then(|m| m.form_limits()).copied();
        let limits = limits::apply_limits(ctx, route_limits.as_ref());

        let span = tracing::debug_span!(
            "antiforgery_validation",
            request_id = %ctx.request_id(),
            endpoint = ctx.endpoint().map(|e| e.display_name()).unwrap_or_default(),
        );

        let outcome = match self.validator.validate(ctx).instrument(span).await {
            Ok(()) => ValidationOutcome::Valid,
            Err(Error::Validation(err)) => ValidationOutcome::Invalid(err),
            Err(err) => return Err(err),
        };

        let valid = outcome.is_valid();
        if ctx.record_antiforgery_outcome(outcome).is_err() {
            return Ok(GateDecision::AlreadyConcluded);
        }

        Ok(GateDecision::Validated { valid, limits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{Method, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::endpoint::{Endpoint, RouteMetadata};
    use crate::error::{ValidationError, ValidationFailureKind};
    use crate::form::{FormError, FormLimitsOverride};
    use crate::policy::RequireAntiforgeryToken;

    enum Verdict {
        Pass,
        Fail,
        Fault,
    }

    struct Scripted {
        verdict: Verdict,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(verdict: Verdict) -> Self {
            Self {
                verdict,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenValidator<()> for Scripted {
        async fn validate(&self, _ctx: &mut RequestContext<()>) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.verdict {
                Verdict::Pass => Ok(()),
                Verdict::Fail => Err(ValidationError::new(
                    ValidationFailureKind::TokenMismatch,
                    "mismatch",
                )
                .into()),
                Verdict::Fault => Err(FormError::BodyConsumed.into()),
            }
        }
    }

    fn ctx(method: Method, metadata: Option<RouteMetadata>) -> RequestContext<()> {
        let ctx = RequestContext::from_request(
            Request::builder().method(method).uri("/todos").body(()).unwrap(),
        );
        match metadata {
            Some(metadata) => ctx.with_endpoint(Endpoint::new("todos", metadata).shared()),
            None => ctx,
        }
    }

    fn required() -> Option<RouteMetadata> {
        Some(RouteMetadata::new().with(RequireAntiforgeryToken))
    }

    #[tokio::test]
    async fn safe_method_is_skipped_even_when_required() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let mut ctx = ctx(Method::GET, required());

        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert_eq!(decision, GateDecision::SkippedSafeMethod);
        assert!(ctx.antiforgery_outcome().is_none());
        assert!(ctx.antiforgery_considered());
        assert_eq!(gate.validator().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmatched_request_is_not_considered() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let mut ctx = ctx(Method::POST, None);

        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert_eq!(decision, GateDecision::SkippedNotRequired);
        assert!(!ctx.antiforgery_considered());
        assert!(ctx.antiforgery_outcome().is_none());
    }

    #[tokio::test]
    async fn passing_validator_records_valid() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let mut ctx = ctx(Method::POST, required());

        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert_eq!(
            decision,
            GateDecision::Validated {
                valid: true,
                limits: LimitsApplication::NotConfigured
            }
        );
        assert_eq!(ctx.antiforgery_outcome(), Some(&ValidationOutcome::Valid));
    }

    #[tokio::test]
    async fn failing_validator_records_invalid() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Fail));
        let mut ctx = ctx(Method::DELETE, required());

        gate.evaluate(&mut ctx).await.unwrap();

        let outcome = ctx.antiforgery_outcome().expect("outcome recorded");
        assert_eq!(
            outcome.error().map(ValidationError::kind),
            Some(ValidationFailureKind::TokenMismatch)
        );
    }

    #[tokio::test]
    async fn fault_propagates_without_outcome() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Fault));
        let mut ctx = ctx(Method::PUT, required());

        let err = gate.evaluate(&mut ctx).await.unwrap_err();

        assert!(matches!(err, Error::Form(FormError::BodyConsumed)));
        assert!(ctx.antiforgery_outcome().is_none());
    }

    #[tokio::test]
    async fn second_gate_does_not_revalidate() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let mut ctx = ctx(Method::PATCH, required());

        gate.evaluate(&mut ctx).await.unwrap();
        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert_eq!(decision, GateDecision::AlreadyConcluded);
        assert_eq!(gate.validator().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn route_limits_are_installed_before_validation() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let limits = FormLimitsOverride {
            value_count_limit: 7,
            ..FormLimitsOverride::default()
        };
        let metadata = RouteMetadata::new()
            .with(RequireAntiforgeryToken)
            .with(limits);
        let mut ctx = ctx(Method::POST, Some(metadata));

        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert!(matches!(
            decision,
            GateDecision::Validated {
                limits: LimitsApplication::Applied,
                ..
            }
        ));
        assert_eq!(ctx.form_options().map(|o| o.value_count_limit), Some(7));
    }

    #[tokio::test]
    async fn unrequired_route_leaves_limits_alone() {
        let gate = AntiforgeryGate::new(Scripted::new(Verdict::Pass));
        let metadata = RouteMetadata::new().with(FormLimitsOverride::default());
        let mut ctx = ctx(Method::POST, Some(metadata));

        let decision = gate.evaluate(&mut ctx).await.unwrap();

        assert_eq!(decision, GateDecision::SkippedNotRequired);
        assert!(ctx.form_options().is_none());
    }
}
