//! Rejection of requests that failed antiforgery validation.
//!
//! The gate only records a verdict. Endpoints that want a failed verdict to
//! stop the request put [`RequireAntiforgeryLayer`] (or call
//! [`check_antiforgery`]) between the gate and the handler.

use std::task::{Context, Poll};

use futures_util::future::{self, BoxFuture, FutureExt};
use http::StatusCode;
use tower::{Layer, Service};

use crate::context::RequestContext;
use crate::error::ValidationError;
use crate::method;
use crate::outcome::ValidationOutcome;
use crate::policy;

/// Why a request was refused by the enforcement stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AntiforgeryRejection {
    /// The gate recorded an invalid outcome
    #[error("antiforgery token validation failed: {0}")]
    Invalid(ValidationError),

    /// The endpoint requires validation but no gate saw the request
    #[error(
        "endpoint {endpoint} requires antiforgery validation but no antiforgery gate ran for the request"
    )]
    MiddlewareMissing {
        /// Display name of the endpoint
        endpoint: String,
    },

    /// A gate saw the request but recorded no verdict for this endpoint
    #[error("endpoint {endpoint} requires antiforgery validation but no verdict was recorded")]
    NotValidated {
        /// Display name of the endpoint
        endpoint: String,
    },
}

impl AntiforgeryRejection {
    /// HTTP status to answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            AntiforgeryRejection::Invalid(_) => StatusCode::BAD_REQUEST,
            AntiforgeryRejection::MiddlewareMissing { .. }
            | AntiforgeryRejection::NotValidated { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Checks the recorded verdict of a request whose endpoint requires it.
///
/// Requests with a safe method or an endpoint without a requirement always
/// pass.
///
/// # Errors
///
/// - [`AntiforgeryRejection::Invalid`] when the gate recorded a failure
/// - [`AntiforgeryRejection::MiddlewareMissing`] when no gate considered the
///   request at all
/// - [`AntiforgeryRejection::NotValidated`] when a gate considered the request
///   but left no verdict, e.g. the endpoint was swapped after the gate ran
///
/// # Examples
///
/// ```
/// use antiforgery_gate::web::{check_antiforgery, AntiforgeryRejection};
/// use antiforgery_gate::{Endpoint, RequestContext, RequireAntiforgeryToken, RouteMetadata};
///
/// let endpoint = Endpoint::new("POST /todos", RouteMetadata::new().with(RequireAntiforgeryToken));
/// let ctx = RequestContext::from_request(http::Request::post("/todos").body(()).unwrap())
///     .with_endpoint(endpoint.shared());
///
/// let rejection = check_antiforgery(&ctx).unwrap_err();
/// assert!(matches!(rejection, AntiforgeryRejection::MiddlewareMissing { .. }));
/// assert_eq!(rejection.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
/// ```
pub fn check_antiforgery<B>(ctx: &RequestContext<B>) -> Result<(), AntiforgeryRejection> {
    if !method::is_form_bearing(ctx.method()) || !policy::requires_validation(ctx.route_metadata())
    {
        return Ok(());
    }

    let endpoint = || {
        ctx.endpoint()
            .map(|e| e.display_name().to_owned())
            .unwrap_or_default()
    };

    match ctx.antiforgery_outcome() {
        Some(ValidationOutcome::Invalid(err)) => Err(AntiforgeryRejection::Invalid(err.clone())),
        Some(ValidationOutcome::Valid) => Ok(()),
        None if ctx.antiforgery_considered() => Err(AntiforgeryRejection::NotValidated {
            endpoint: endpoint(),
        }),
        None => Err(AntiforgeryRejection::MiddlewareMissing {
            endpoint: endpoint(),
        }),
    }
}

/// Layer that refuses requests failing [`check_antiforgery`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAntiforgeryLayer;

impl RequireAntiforgeryLayer {
    /// Creates the layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequireAntiforgeryLayer {
    type Service = RequireAntiforgeryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAntiforgeryService { inner }
    }
}

/// Service produced by [`RequireAntiforgeryLayer`].
///
/// Rejections are converted into the inner service's error type.
#[derive(Debug, Clone)]
pub struct RequireAntiforgeryService<S> {
    inner: S,
}

impl<S, B> Service<RequestContext<B>> for RequireAntiforgeryService<S>
where
    S: Service<RequestContext<B>>,
    S::Response: Send + 'static,
    S::Error: From<AntiforgeryRejection> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, ctx: RequestContext<B>) -> Self::Future {
        match check_antiforgery(&ctx) {
            Ok(()) => self.inner.call(ctx).boxed(),
            Err(rejection) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    status = rejection.status().as_u16(),
                    "Rejecting request after antiforgery check"
                );
                let err: S::Error = rejection.into();
                future::ready(Err(err)).boxed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Request};

    use crate::endpoint::{Endpoint, RouteMetadata};
    use crate::error::ValidationFailureKind;
    use crate::policy::RequireAntiforgeryToken;

    fn ctx(method: Method) -> RequestContext<()> {
        let endpoint = Endpoint::new("todos", RouteMetadata::new().with(RequireAntiforgeryToken));
        RequestContext::from_request(
            Request::builder().method(method).uri("/todos").body(()).unwrap(),
        )
        .with_endpoint(endpoint.shared())
    }

    #[test]
    fn safe_method_passes_without_outcome() {
        assert!(check_antiforgery(&ctx(Method::GET)).is_ok());
    }

    #[test]
    fn unrequired_endpoint_passes() {
        let ctx = RequestContext::from_request(Request::post("/").body(()).unwrap())
            .with_endpoint(Endpoint::new("open", RouteMetadata::new()).shared());
        assert!(check_antiforgery(&ctx).is_ok());
    }

    #[test]
    fn missing_gate_is_a_server_error() {
        let rejection = check_antiforgery(&ctx(Method::POST)).unwrap_err();
        assert_eq!(
            rejection,
            AntiforgeryRejection::MiddlewareMissing {
                endpoint: "todos".to_string()
            }
        );
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn considered_without_verdict_is_rejected() {
        let mut ctx = ctx(Method::POST);
        ctx.mark_antiforgery_considered();

        let rejection = check_antiforgery(&ctx).unwrap_err();
        assert_eq!(
            rejection,
            AntiforgeryRejection::NotValidated {
                endpoint: "todos".to_string()
            }
        );
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_outcome_is_a_bad_request() {
        let mut ctx = ctx(Method::POST);
        ctx.mark_antiforgery_considered();
        ctx.record_antiforgery_outcome(ValidationOutcome::Invalid(ValidationError::new(
            ValidationFailureKind::Expired,
            "expired",
        )))
        .unwrap();

        let rejection = check_antiforgery(&ctx).unwrap_err();
        assert!(matches!(rejection, AntiforgeryRejection::Invalid(_)));
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn valid_outcome_passes() {
        let mut ctx = ctx(Method::POST);
        ctx.mark_antiforgery_considered();
        ctx.record_antiforgery_outcome(ValidationOutcome::Valid).unwrap();
        assert!(check_antiforgery(&ctx).is_ok());
    }
}
