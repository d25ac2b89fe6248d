use std::sync::Arc;

use async_trait::async_trait;
use http_body::Body;

use crate::config::AntiforgeryOptions;
use crate::context::RequestContext;
use crate::error::{BoxError, Error};
use crate::token::{AntiforgeryTokenSet, TokenVerifier};

/// Validates the antiforgery token pair of a request.
///
/// Implementations may read the request form through the context, so they
/// are handed mutable access. Any [`Error::Validation`] is recorded by the
/// gate as an invalid outcome. Every other error is a fault and travels up
/// the pipeline unchanged.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{Error, RequestContext, TokenValidator};
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
/// ```
#[async_trait]
pub trait TokenValidator<B>: Send + Sync {
    /// Checks the request's tokens.
    async fn validate(&self, ctx: &mut RequestContext<B>) -> Result<(), Error>;
}

#[async_trait]
impl<B, V> TokenValidator<B> for Arc<V>
where
    B: Send + 'static,
    V: TokenValidator<B> + ?Sized,
{
    async fn validate(&self, ctx: &mut RequestContext<B>) -> Result<(), Error> {
        (**self).validate(ctx).await
    }
}

/// Validator that extracts the token pair and hands it to a [`TokenVerifier`].
///
/// Missing tokens are reported before the verifier is consulted, cookie
/// first.
#[derive(Debug, Clone)]
pub struct DefaultTokenValidator<T> {
    options: AntiforgeryOptions,
    verifier: T,
}

impl<T> DefaultTokenValidator<T> {
    /// Creates a validator reading tokens as described by `options`.
    pub fn new(options: AntiforgeryOptions, verifier: T) -> Self {
        Self { options, verifier }
    }

    /// Returns the token location options.
    pub fn options(&self) -> &AntiforgeryOptions {
        &self.options
    }
}

#[async_trait]
impl<B, T> TokenValidator<B> for DefaultTokenValidator<T>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    T: TokenVerifier,
{
    async fn validate(&self, ctx: &mut RequestContext<B>) -> Result<(), Error> {
        let tokens = AntiforgeryTokenSet::from_request(&self.options, ctx).await?;
        let pair = tokens.into_pair(&self.options)?;
        self.verifier.verify(&pair, ctx.parts()).await
    }
}
