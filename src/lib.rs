//! Antiforgery (CSRF) enforcement gate for tower request pipelines.
//!
//! The gate runs after routing and before anything reads the request body.
//! For a form-bearing request to an endpoint that opts in, it:
//! - **Installs form limits**: the route's limits are applied before the body is read
//! - **Validates tokens**: a [`TokenValidator`] checks the cookie and request tokens
//! - **Records a verdict**: a [`ValidationOutcome`] is stored on the request
//!
//! The gate never rejects a request. Downstream stages read the verdict, or
//! use [`web::RequireAntiforgeryLayer`] to turn a failure into a 400.
//!
//! # Core Types
//!
//! - [`RequestContext`]: per-request state shared by every pipeline stage
//! - [`AntiforgeryGate`]: decides, limits, validates and records
//! - [`TokenValidator`]: pluggable validation contract
//! - [`DefaultTokenValidator`]: reads the token pair and defers to a [`TokenVerifier`]
//! - [`web::AntiforgeryLayer`]: the gate as a tower layer
//!
//! # Examples
//!
//! ```
//! use antiforgery_gate::{
//!     AntiforgeryGate, Endpoint, Error, GateDecision, RequestContext, RequireAntiforgeryToken,
//!     RouteMetadata, TokenValidator, ValidationOutcome,
//! };
//! use async_trait::async_trait;
//!
//! struct AlwaysValid;
//!
//! #[async_trait]
//! impl<B: Send + 'static> TokenValidator<B> for AlwaysValid {
//!     async fn validate(&self, _ctx: &mut RequestContext<B>) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! # futures_util::future::FutureExt::now_or_never(async {
//! let gate = AntiforgeryGate::new(AlwaysValid);
//! let endpoint = Endpoint::new("POST /todos", RouteMetadata::new().with(RequireAntiforgeryToken));
//!
//! let mut ctx = RequestContext::from_request(http::Request::post("/todos").body(()).unwrap())
//!     .with_endpoint(endpoint.shared());
//!
//! gate.evaluate(&mut ctx).await.expect("no infrastructure fault");
//! assert_eq!(ctx.antiforgery_outcome(), Some(&ValidationOutcome::Valid));
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod endpoint;
mod error;
mod form;
mod gate;
mod limits;
pub mod logging;
mod method;
mod outcome;
mod policy;
mod token;
mod validator;
pub mod web;

pub use config::{
    AntiforgeryOptions, ConfigError, DEFAULT_COOKIE_NAME, DEFAULT_FORM_FIELD_NAME,
    DEFAULT_HEADER_NAME,
};
pub use context::{RequestContext, X_REQUEST_ID};
pub use endpoint::{AntiforgeryMetadata, Endpoint, MetadataEntry, RouteMetadata};
pub use error::{BoxError, Error, ValidationError, ValidationFailureKind};
pub use form::{
    decode_urlencoded, is_form_content_type, Form, FormError, FormFeature, FormLimitsOverride,
    FormOptions,
};
pub use gate::{AntiforgeryGate, GateDecision};
pub use limits::{apply_limits, LimitsApplication};
pub use method::{is_form_bearing, is_form_bearing_str};
pub use outcome::{OutcomeSlot, ValidationOutcome};
pub use policy::{requires_validation, DisableAntiforgery, RequireAntiforgeryToken};
pub use token::{AntiforgeryTokenSet, TokenPair, TokenValue, TokenVerifier};
pub use validator::{DefaultTokenValidator, TokenValidator};
