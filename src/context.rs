use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::endpoint::{Endpoint, RouteMetadata};
use crate::error::{BoxError, Error};
use crate::form::{self, Form, FormError, FormFeature, FormOptions};
use crate::outcome::{OutcomeSlot, ValidationOutcome};

/// Header carrying the caller-supplied request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Per-request state threaded through every pipeline stage.
///
/// `RequestContext` replaces an open-ended feature bag with explicit
/// fields: the request head, the body (readable once), the form state, the
/// matched endpoint and the antiforgery verdict. It lives exactly as long as
/// the request and is never shared between requests.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{Endpoint, RequestContext, RequireAntiforgeryToken, RouteMetadata};
///
/// let request = http::Request::post("/todos")
///     .header("x-request-id", "req-123")
///     .body(())
///     .unwrap();
///
/// let endpoint = Endpoint::new("POST /todos", RouteMetadata::new().with(RequireAntiforgeryToken));
/// let ctx = RequestContext::from_request(request).with_endpoint(endpoint.shared());
///
/// assert_eq!(ctx.request_id(), "req-123");
/// assert_eq!(ctx.endpoint().unwrap().display_name(), "POST /todos");
///
/// // Nothing has validated this request yet
/// assert!(ctx.antiforgery_outcome().is_none());
/// ```
pub struct RequestContext<B> {
    request_id: String,
    parts: Parts,
    body: Option<B>,
    form: FormFeature,
    endpoint: Option<Arc<Endpoint>>,
    antiforgery: OutcomeSlot,
    antiforgery_considered: bool,
}

impl<B> RequestContext<B> {
    /// Creates a context for an incoming request.
    ///
    /// The request id is taken from the `x-request-id` header, or generated
    /// when the header is absent or not valid UTF-8.
    pub fn from_request(request: Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            request_id,
            parts,
            body: Some(body),
            form: FormFeature::default(),
            endpoint: None,
            antiforgery: OutcomeSlot::default(),
            antiforgery_considered: false,
        }
    }

    /// Attaches the endpoint selected by the routing layer.
    pub fn with_endpoint(mut self, endpoint: Arc<Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Replaces the matched endpoint.
    pub fn set_endpoint(&mut self, endpoint: Option<Arc<Endpoint>>) {
        self.endpoint = endpoint;
    }

    /// Returns the request id for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the full request head.
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Returns the request `Content-Type`, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the request declares a form content type.
    pub fn has_form_content_type(&self) -> bool {
        self.content_type().is_some_and(form::is_form_content_type)
    }

    /// Returns the matched endpoint, if routing found one.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_deref()
    }

    /// Returns the metadata of the matched endpoint.
    pub fn route_metadata(&self) -> Option<&RouteMetadata> {
        self.endpoint().map(Endpoint::metadata)
    }

    /// Returns the form state of this request.
    pub fn form_feature(&self) -> &FormFeature {
        &self.form
    }

    /// Returns the form options installed for this request, if any.
    pub fn form_options(&self) -> Option<&FormOptions> {
        self.form.options()
    }

    /// Returns the form if it has already been read.
    pub fn form(&self) -> Option<&Form> {
        self.form.form()
    }

    /// Installs a form parsed by another stage.
    ///
    /// Use this from body parsers that handle content types the built-in
    /// reader does not, such as `multipart/form-data`.
    pub fn set_form(&mut self, form: Form) {
        self.form.set_form(form);
    }

    /// Takes the request body out of the context.
    ///
    /// Taking the body counts as having begun reading the form, so limits
    /// can no longer be applied afterwards.
    pub fn take_body(&mut self) -> Option<B> {
        self.form.mark_read_started();
        self.body.take()
    }

    /// Returns the antiforgery verdict, if the gate recorded one.
    pub fn antiforgery_outcome(&self) -> Option<&ValidationOutcome> {
        self.antiforgery.get()
    }

    /// Returns `true` if the antiforgery gate saw this request with a matched endpoint.
    pub fn antiforgery_considered(&self) -> bool {
        self.antiforgery_considered
    }

    /// Splits the context back into the request head and the unread body.
    pub fn into_parts(self) -> (Parts, Option<B>) {
        (self.parts, self.body)
    }

    pub(crate) fn form_feature_mut(&mut self) -> &mut FormFeature {
        &mut self.form
    }

    pub(crate) fn mark_antiforgery_considered(&mut self) {
        self.antiforgery_considered = true;
    }

    pub(crate) fn record_antiforgery_outcome(
        &mut self,
        outcome: ValidationOutcome,
    ) -> Result<(), ValidationOutcome> {
        self.antiforgery.set(outcome)
    }
}

impl<B> RequestContext<B>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    /// Reads and decodes the request form, honouring the installed options.
    ///
    /// The form is read at most once; later calls return the cached form.
    ///
    /// # Errors
    ///
    /// - [`Error::Form`] when a limit is exceeded, the body was already
    ///   consumed, or the content type has no built-in reader
    /// - [`Error::Body`] when the body stream fails
    pub async fn read_form(&mut self) -> Result<&Form, Error> {
        if self.form.form().is_none() {
            let form = self.load_form().await?;
            self.form.set_form(form);
        }
        self.form
            .form()
            .ok_or_else(|| Error::Form(FormError::BodyConsumed))
    }

    async fn load_form(&mut self) -> Result<Form, Error> {
        let content_type = self.content_type().unwrap_or_default().to_owned();
        if !form::is_urlencoded(&content_type) {
            return Err(FormError::UnsupportedContentType(content_type).into());
        }

        let options = self.form.effective_options();
        let body = self.take_body().ok_or(FormError::BodyConsumed)?;
        let limit = usize::try_from(options.buffer_body_length_limit).unwrap_or(usize::MAX);

        let bytes = Limited::new(body, limit)
            .collect()
            .await
            .map_err(|err| {
                if err.is::<LengthLimitError>() {
                    Error::Form(FormError::BodyLengthLimitExceeded {
                        limit: options.buffer_body_length_limit,
                    })
                } else {
                    Error::Body(err)
                }
            })?
            .to_bytes();

        Ok(form::decode_urlencoded(&bytes, &options)?)
    }
}

impl<B> fmt::Debug for RequestContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("endpoint", &self.endpoint().map(Endpoint::display_name))
            .field("form", &self.form)
            .field("antiforgery", &self.antiforgery)
            .field("antiforgery_considered", &self.antiforgery_considered)
            .finish_non_exhaustive()
    }
}
