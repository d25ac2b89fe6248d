//! Token pair extraction and the verification contract.
//!
//! The cookie token and the request token are read here. Deciding whether
//! they correlate is delegated to a [`TokenVerifier`], which owns the
//! cryptography.

use std::fmt;

use async_trait::async_trait;
use http::header::COOKIE;
use http::request::Parts;
use http::HeaderMap;
use http_body::Body;

use crate::config::AntiforgeryOptions;
use crate::context::RequestContext;
use crate::error::{BoxError, Error, ValidationError};

/// A token value read from the request.
///
/// Debug and Display output is always `[REDACTED]` so tokens never reach
/// logs through formatting.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::TokenValue;
///
/// let token = TokenValue::new("CfDJ8N...".to_string());
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(token.expose(), "CfDJ8N...");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TokenValue {
    inner: String,
}

impl TokenValue {
    /// Wraps a token value.
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Returns the raw token for verification.
    ///
    /// The result must not be logged.
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Tokens found on a request; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AntiforgeryTokenSet {
    /// Token from the antiforgery cookie
    pub cookie_token: Option<TokenValue>,
    /// Token from the request header or form field
    pub request_token: Option<TokenValue>,
}

impl AntiforgeryTokenSet {
    /// Reads both tokens from the request.
    ///
    /// The request token is looked up in the configured header first. The
    /// form is read only when the header is absent, the request has a form
    /// content type and form lookup is not suppressed.
    ///
    /// # Errors
    ///
    /// Form reading failures propagate unchanged. A missing token is not an
    /// error here; see [`AntiforgeryTokenSet::into_pair`].
    pub async fn from_request<B>(
        options: &AntiforgeryOptions,
        ctx: &mut RequestContext<B>,
    ) -> Result<Self, Error>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let cookie_token = cookie_value(ctx.headers(), &options.cookie_name).map(TokenValue::new);

        let mut request_token = options
            .header_name
            .as_deref()
            .and_then(|name| header_value(ctx.headers(), name))
            .map(TokenValue::new);

        if request_token.is_none()
            && !options.suppress_reading_token_from_form_body
            && ctx.has_form_content_type()
        {
            let form = ctx.read_form().await?;
            request_token = form
                .get(&options.form_field_name)
                .filter(|v| !v.is_empty())
                .map(|v| TokenValue::new(v.to_owned()));
        }

        Ok(Self {
            cookie_token,
            request_token,
        })
    }

    /// Requires both tokens to be present.
    ///
    /// # Errors
    ///
    /// Returns a missing-cookie or missing-request-token validation error,
    /// checking the cookie first.
    pub fn into_pair(self, options: &AntiforgeryOptions) -> Result<TokenPair, ValidationError> {
        let cookie_token = self
            .cookie_token
            .ok_or_else(|| ValidationError::missing_cookie(&options.cookie_name))?;
        let request_token = self.request_token.ok_or_else(|| {
            ValidationError::missing_request_token(
                &options.form_field_name,
                options.header_name.as_deref(),
            )
        })?;

        Ok(TokenPair {
            cookie_token,
            request_token,
        })
    }
}

/// A complete token pair ready for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Token from the antiforgery cookie
    pub cookie_token: TokenValue,
    /// Token from the request header or form field
    pub request_token: TokenValue,
}

/// Cryptographic correlation of a token pair.
///
/// Implementations decode both tokens, check that they were issued together,
/// that they are still valid and that they belong to the requesting user.
///
/// Return [`Error::Validation`] for anything the client could have caused
/// and [`Error::Unavailable`] when the key material cannot be reached.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies `tokens` for the request described by `request`.
    async fn verify(&self, tokens: &TokenPair, request: &Parts) -> Result<(), Error>;
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
