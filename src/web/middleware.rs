//! Tower integration for [`AntiforgeryGate`].
//!
//! # Pipeline Position
//!
//! ```text
//! transport → RequestContext::from_request
//!   ↓
//! routing → RequestContext::with_endpoint
//!   ↓
//! AntiforgeryLayer (limits, validation, outcome recorded)
//!   ↓
//! body parsing / RequireAntiforgeryLayer / handler
//! ```
//!
//! The layer must sit after routing so the endpoint metadata is visible,
//! and before anything that reads the form.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::context::RequestContext;
use crate::error::Error;
use crate::gate::AntiforgeryGate;
use crate::validator::TokenValidator;

/// Layer that runs an [`AntiforgeryGate`] in front of the inner service.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::web::AntiforgeryLayer;
/// use antiforgery_gate::{Error, RequestContext, TokenValidator};
/// use async_trait::async_trait;
/// use tower::{service_fn, ServiceBuilder};
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
/// let service = ServiceBuilder::new()
///     .layer(AntiforgeryLayer::new(AlwaysValid))
///     .service(service_fn(|ctx: RequestContext<()>| async move {
///         Ok::<_, Error>(ctx.antiforgery_outcome().cloned())
///     }));
/// # let _ = service;
/// ```
#[derive(Debug)]
pub struct AntiforgeryLayer<V> {
    gate: Arc<AntiforgeryGate<V>>,
}

impl<V> AntiforgeryLayer<V> {
    /// Creates a layer validating with `validator`.
    pub fn new(validator: V) -> Self {
        Self::from_gate(AntiforgeryGate::new(validator))
    }

    /// Creates a layer around an existing gate.
    pub fn from_gate(gate: AntiforgeryGate<V>) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

impl<V> Clone for AntiforgeryLayer<V> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S, V> Layer<S> for AntiforgeryLayer<V> {
    type Service = AntiforgeryService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        AntiforgeryService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Service produced by [`AntiforgeryLayer`].
///
/// Each call evaluates the gate, then forwards the same context to the
/// inner service. Infrastructure errors from validation are converted into
/// the inner service's error type and the inner service is not called.
#[derive(Debug)]
pub struct AntiforgeryService<S, V> {
    inner: S,
    gate: Arc<AntiforgeryGate<V>>,
}

impl<S: Clone, V> Clone for AntiforgeryService<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S, V, B> Service<RequestContext<B>> for AntiforgeryService<S, V>
where
    S: Service<RequestContext<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: From<Error>,
    V: TokenValidator<B> + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut ctx: RequestContext<B>) -> Self::Future {
        // The readied service goes into the future; keep a fresh clone here
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);

        Box::pin(async move {
            gate.evaluate(&mut ctx).await?;
            inner.call(ctx).await
        })
    }
}
