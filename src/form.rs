//! Form limits, installed form options and url-encoded form decoding.
//!
//! Routes may declare a [`FormLimitsOverride`]. Before the body is read the
//! gate converts it into [`FormOptions`], which the form reader then enforces.

use serde::{Deserialize, Serialize};

const DEFAULT_MEMORY_BUFFER_THRESHOLD: usize = 64 * 1024;
const DEFAULT_BUFFER_BODY_LENGTH_LIMIT: u64 = 128 * 1024 * 1024;
const DEFAULT_VALUE_COUNT_LIMIT: usize = 1024;
const DEFAULT_KEY_LENGTH_LIMIT: usize = 2048;
const DEFAULT_VALUE_LENGTH_LIMIT: usize = 4 * 1024 * 1024;
const DEFAULT_MULTIPART_BOUNDARY_LENGTH_LIMIT: usize = 128;
const DEFAULT_MULTIPART_HEADERS_COUNT_LIMIT: usize = 16;
const DEFAULT_MULTIPART_HEADERS_LENGTH_LIMIT: usize = 16 * 1024;
const DEFAULT_MULTIPART_BODY_LENGTH_LIMIT: u64 = 128 * 1024 * 1024;

/// Per-route limits for reading the request form.
///
/// Unset fields fall back to the framework defaults, so a route that only
/// cares about one limit can override just that one.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::FormLimitsOverride;
///
/// let limits = FormLimitsOverride {
///     value_count_limit: 2,
///     ..FormLimitsOverride::default()
/// };
/// assert_eq!(limits.value_count_limit, 2);
/// assert_eq!(limits.key_length_limit, 2048);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormLimitsOverride {
    /// Buffer the body so it can be read more than once
    pub buffer_body: bool,
    /// Bytes kept in memory before buffering spills elsewhere
    pub memory_buffer_threshold: usize,
    /// Maximum length of a buffered body
    pub buffer_body_length_limit: u64,
    /// Maximum number of form entries
    pub value_count_limit: usize,
    /// Maximum length of a form key
    pub key_length_limit: usize,
    /// Maximum length of a form value
    pub value_length_limit: usize,
    /// Maximum length of a multipart boundary
    pub multipart_boundary_length_limit: usize,
    /// Maximum number of headers per multipart section
    pub multipart_headers_count_limit: usize,
    /// Maximum total header length per multipart section
    pub multipart_headers_length_limit: usize,
    /// Maximum length of a multipart section body
    pub multipart_body_length_limit: u64,
}

impl Default for FormLimitsOverride {
    fn default() -> Self {
        Self {
            buffer_body: false,
            memory_buffer_threshold: DEFAULT_MEMORY_BUFFER_THRESHOLD,
            buffer_body_length_limit: DEFAULT_BUFFER_BODY_LENGTH_LIMIT,
            value_count_limit: DEFAULT_VALUE_COUNT_LIMIT,
            key_length_limit: DEFAULT_KEY_LENGTH_LIMIT,
            value_length_limit: DEFAULT_VALUE_LENGTH_LIMIT,
            multipart_boundary_length_limit: DEFAULT_MULTIPART_BOUNDARY_LENGTH_LIMIT,
            multipart_headers_count_limit: DEFAULT_MULTIPART_HEADERS_COUNT_LIMIT,
            multipart_headers_length_limit: DEFAULT_MULTIPART_HEADERS_LENGTH_LIMIT,
            multipart_body_length_limit: DEFAULT_MULTIPART_BODY_LENGTH_LIMIT,
        }
    }
}

/// Body-reading configuration installed on a request before its form is read.
///
/// Multipart limits are carried for the external multipart parser; the
/// built-in url-encoded reader enforces the body, count and length limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormOptions {
    /// Buffer the body so it can be read more than once
    pub buffer_body: bool,
    /// Bytes kept in memory before buffering spills elsewhere
    pub memory_buffer_threshold: usize,
    /// Maximum length of the body read for a form
    pub buffer_body_length_limit: u64,
    /// Maximum number of form entries
    pub value_count_limit: usize,
    /// Maximum length of a form key
    pub key_length_limit: usize,
    /// Maximum length of a form value
    pub value_length_limit: usize,
    /// Maximum length of a multipart boundary
    pub multipart_boundary_length_limit: usize,
    /// Maximum number of headers per multipart section
    pub multipart_headers_count_limit: usize,
    /// Maximum total header length per multipart section
    pub multipart_headers_length_limit: usize,
    /// Maximum length of a multipart section body
    pub multipart_body_length_limit: u64,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::from(&FormLimitsOverride::default())
    }
}

impl From<&FormLimitsOverride> for FormOptions {
    fn from(limits: &FormLimitsOverride) -> Self {
        Self {
            buffer_body: limits.buffer_body,
            memory_buffer_threshold: limits.memory_buffer_threshold,
            buffer_body_length_limit: limits.buffer_body_length_limit,
            value_count_limit: limits.value_count_limit,
            key_length_limit: limits.key_length_limit,
            value_length_limit: limits.value_length_limit,
            multipart_boundary_length_limit: limits.multipart_boundary_length_limit,
            multipart_headers_count_limit: limits.multipart_headers_count_limit,
            multipart_headers_length_limit: limits.multipart_headers_length_limit,
            multipart_body_length_limit: limits.multipart_body_length_limit,
        }
    }
}

/// Errors raised while reading a request form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// More entries than `value_count_limit`
    #[error("form value count limit {limit} exceeded")]
    ValueCountLimitExceeded {
        /// The configured limit
        limit: usize,
    },
    /// A key longer than `key_length_limit`
    #[error("form key length limit {limit} exceeded")]
    KeyLengthLimitExceeded {
        /// The configured limit
        limit: usize,
    },
    /// A value longer than `value_length_limit`
    #[error("form value length limit {limit} exceeded")]
    ValueLengthLimitExceeded {
        /// The configured limit
        limit: usize,
    },
    /// A body longer than `buffer_body_length_limit`
    #[error("form body length limit {limit} exceeded")]
    BodyLengthLimitExceeded {
        /// The configured limit
        limit: u64,
    },
    /// The body was taken by an earlier stage without producing a form
    #[error("request body has already been consumed")]
    BodyConsumed,
    /// The content type has no built-in form reader
    #[error("no form reader for content type {0:?}")]
    UnsupportedContentType(String),
}

/// A decoded request form.
///
/// Entries keep their submission order; a key may appear more than once.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::Form;
///
/// let form: Form = [("name", "Test task"), ("tag", "a"), ("tag", "b")]
///     .into_iter()
///     .collect();
/// assert_eq!(form.get("name"), Some("Test task"));
/// assert_eq!(form.get("tag"), Some("a"));
/// assert_eq!(form.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    entries: Vec<(String, String)>,
}

impl Form {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the form has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Form
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Form state of a single request.
///
/// Tracks the installed options and whether reading has started. Once a
/// read has started the options are frozen.
#[derive(Debug, Default)]
pub struct FormFeature {
    options: Option<FormOptions>,
    read_started: bool,
    form: Option<Form>,
}

impl FormFeature {
    /// Returns the installed options, if any.
    pub fn options(&self) -> Option<&FormOptions> {
        self.options.as_ref()
    }

    /// Returns the options the reader will enforce.
    pub fn effective_options(&self) -> FormOptions {
        self.options.unwrap_or_default()
    }

    /// Returns `true` once a form has been materialized or a read has begun.
    pub fn has_begun_reading(&self) -> bool {
        self.read_started || self.form.is_some()
    }

    /// Returns the materialized form.
    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub(crate) fn install_options(&mut self, options: FormOptions) {
        self.options = Some(options);
    }

    pub(crate) fn mark_read_started(&mut self) {
        self.read_started = true;
    }

    pub(crate) fn set_form(&mut self, form: Form) {
        self.read_started = true;
        self.form = Some(form);
    }
}

/// Returns `true` for content types that carry a form.
pub fn is_form_content_type(content_type: &str) -> bool {
    is_urlencoded(content_type) || is_multipart(content_type)
}

pub(crate) fn is_urlencoded(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case("application/x-www-form-urlencoded")
}

pub(crate) fn is_multipart(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case("multipart/form-data")
}

fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Decodes an `application/x-www-form-urlencoded` body under `options`.
///
/// # Errors
///
/// Returns the first limit that the body violates.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{decode_urlencoded, FormError, FormOptions};
///
/// let options = FormOptions { value_count_limit: 1, ..FormOptions::default() };
/// let err = decode_urlencoded(b"a=1&b=2", &options).unwrap_err();
/// assert_eq!(err, FormError::ValueCountLimitExceeded { limit: 1 });
/// ```
pub fn decode_urlencoded(body: &[u8], options: &FormOptions) -> Result<Form, FormError> {
    if body.len() as u64 > options.buffer_body_length_limit {
        return Err(FormError::BodyLengthLimitExceeded {
            limit: options.buffer_body_length_limit,
        });
    }

    let mut entries = Vec::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        if entries.len() >= options.value_count_limit {
            return Err(FormError::ValueCountLimitExceeded {
                limit: options.value_count_limit,
            });
        }
        if key.len() > options.key_length_limit {
            return Err(FormError::KeyLengthLimitExceeded {
                limit: options.key_length_limit,
            });
        }
        if value.len() > options.value_length_limit {
            return Err(FormError::ValueLengthLimitExceeded {
                limit: options.value_length_limit,
            });
        }
        entries.push((key.into_owned(), value.into_owned()));
    }

    Ok(Form { entries })
}
