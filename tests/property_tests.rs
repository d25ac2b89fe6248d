//! Integration property tests for antiforgery-gate.
//!
//! These tests check the gate's cross-module invariants over arbitrary
//! methods, routes, tokens and form bodies.

use antiforgery_gate::{
    apply_limits, decode_urlencoded, is_form_bearing_str, requires_validation, AntiforgeryGate,
    Endpoint, Error, FormError, FormLimitsOverride, FormOptions, GateDecision, LimitsApplication,
    RequestContext, RequireAntiforgeryToken, RouteMetadata, TokenValidator, TokenValue,
    ValidationError, ValidationFailureKind, ValidationOutcome,
};
use async_trait::async_trait;
use futures_util::FutureExt;
use http::Request;
use proptest::prelude::*;

/// Validator answering immediately with a fixed verdict.
struct Fixed(bool);

#[async_trait]
impl TokenValidator<()> for Fixed {
    async fn validate(&self, _ctx: &mut RequestContext<()>) -> Result<(), Error> {
        if self.0 {
            Ok(())
        } else {
            Err(ValidationError::new(ValidationFailureKind::TokenMismatch, "mismatch").into())
        }
    }
}

// Strategy: Generate methods, both form-bearing and safe, in any casing
fn arb_method() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just("GET"),
            Just("HEAD"),
            Just("OPTIONS"),
            Just("TRACE"),
            Just("CONNECT"),
            Just("POST"),
            Just("PUT"),
            Just("PATCH"),
            Just("DELETE"),
        ],
        any::<bool>(),
    )
        .prop_map(|(m, lower)| if lower { m.to_ascii_lowercase() } else { m.to_string() })
}

// Strategy: Generate a route, or no route at all
fn arb_route() -> impl Strategy<Value = Option<RouteMetadata>> {
    prop::option::of(any::<bool>().prop_map(|required| {
        if required {
            RouteMetadata::new().with(RequireAntiforgeryToken)
        } else {
            RouteMetadata::new()
        }
    }))
}

fn arb_limits() -> impl Strategy<Value = FormLimitsOverride> {
    (1usize..64, 1usize..4096, 1usize..4096, any::<bool>()).prop_map(
        |(value_count_limit, key_length_limit, value_length_limit, buffer_body)| {
            FormLimitsOverride {
                buffer_body,
                value_count_limit,
                key_length_limit,
                value_length_limit,
                ..FormLimitsOverride::default()
            }
        },
    )
}

proptest! {
    /// Property: only the four form-bearing methods are classified as such
    #[test]
    fn proptest_form_bearing_ignores_case(method in arb_method()) {
        let expected = matches!(
            method.to_ascii_uppercase().as_str(),
            "POST" | "PUT" | "PATCH" | "DELETE"
        );
        prop_assert_eq!(is_form_bearing_str(&method), expected);
    }

    /// Property: an outcome is recorded exactly when a matched, requiring
    /// route receives a form-bearing request
    #[test]
    fn proptest_outcome_recorded_only_when_required(
        method in arb_method(),
        route in arb_route(),
        valid in any::<bool>(),
    ) {
        let http_method = http::Method::from_bytes(method.as_bytes()).unwrap();
        let gated = is_form_bearing_str(&method) && requires_validation(route.as_ref());

        let mut ctx = RequestContext::from_request(
            Request::builder().method(http_method).uri("/").body(()).unwrap(),
        );
        let matched = route.is_some();
        if let Some(route) = route {
            ctx.set_endpoint(Some(Endpoint::new("route", route).shared()));
        }

        let gate = AntiforgeryGate::new(Fixed(valid));
        let decision = gate
            .evaluate(&mut ctx)
            .now_or_never()
            .expect("validator answers immediately")
            .expect("no fault");

        prop_assert_eq!(ctx.antiforgery_considered(), matched);
        if gated {
            let validated = matches!(decision, GateDecision::Validated { .. });
            prop_assert!(validated);
            prop_assert_eq!(
                ctx.antiforgery_outcome().map(ValidationOutcome::is_valid),
                Some(valid)
            );
        } else {
            prop_assert!(ctx.antiforgery_outcome().is_none());
        }
    }

    /// Property: applying the same limits twice equals applying them once
    #[test]
    fn proptest_apply_limits_idempotent(limits in arb_limits()) {
        let mut ctx = RequestContext::from_request(Request::post("/").body(()).unwrap());

        apply_limits(&mut ctx, Some(&limits));
        let once = ctx.form_options().copied();
        apply_limits(&mut ctx, Some(&limits));

        prop_assert_eq!(ctx.form_options().copied(), once);
        prop_assert_eq!(once, Some(FormOptions::from(&limits)));
    }

    /// Property: without an override the installed options never change
    #[test]
    fn proptest_missing_override_is_noop(limits in arb_limits()) {
        let mut ctx = RequestContext::from_request(Request::post("/").body(()).unwrap());
        apply_limits(&mut ctx, Some(&limits));
        let before = ctx.form_options().copied();

        apply_limits(&mut ctx, None);

        prop_assert_eq!(ctx.form_options().copied(), before);
    }

    /// Property: once the form has been read, no override replaces the
    /// options installed before
    #[test]
    fn proptest_read_form_keeps_installed_options(
        first in arb_limits(),
        second in arb_limits(),
        taken in any::<bool>(),
    ) {
        let mut ctx = RequestContext::from_request(Request::post("/").body(()).unwrap());
        apply_limits(&mut ctx, Some(&first));
        if taken {
            let _ = ctx.take_body();
        } else {
            ctx.set_form([("k", "v")].into_iter().collect());
        }

        prop_assert_eq!(apply_limits(&mut ctx, Some(&second)), LimitsApplication::AlreadyRead);
        prop_assert_eq!(ctx.form_options().copied(), Some(FormOptions::from(&first)));
    }

    /// Property: decoding accepts exactly the forms within the value count limit
    #[test]
    fn proptest_value_count_limit_enforced(
        pairs in prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,12}"), 0..12),
        limit in 1usize..12,
    ) {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        let options = FormOptions { value_count_limit: limit, ..FormOptions::default() };

        match decode_urlencoded(body.as_bytes(), &options) {
            Ok(form) => {
                prop_assert!(pairs.len() <= limit);
                prop_assert_eq!(form.len(), pairs.len());
            }
            Err(err) => {
                prop_assert!(pairs.len() > limit);
                prop_assert_eq!(err, FormError::ValueCountLimitExceeded { limit });
            }
        }
    }

    /// Property: token values never appear in formatted output
    #[test]
    fn proptest_token_value_never_formats_raw(raw in "[A-Za-z0-9_-]{8,64}") {
        let token = TokenValue::new(raw.clone());

        prop_assert_eq!(format!("{:?}", token), "[REDACTED]");
        prop_assert_eq!(format!("{}", token), "[REDACTED]");
        prop_assert_eq!(token.expose(), raw.as_str());
    }
}
