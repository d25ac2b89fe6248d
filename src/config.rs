//! Antiforgery options and their loading from TOML.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → from_toml_str (parse & deserialize)
//!     → validate (semantic checks)
//!     → AntiforgeryOptions (validated, immutable)
//!     → shared by the token validator for every request
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default name of the antiforgery cookie.
pub const DEFAULT_COOKIE_NAME: &str = ".Antiforgery";
/// Default form field carrying the request token.
pub const DEFAULT_FORM_FIELD_NAME: &str = "__RequestVerificationToken";
/// Default header carrying the request token.
pub const DEFAULT_HEADER_NAME: &str = "RequestVerificationToken";

/// Where the token pair is read from.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::AntiforgeryOptions;
///
/// let options = AntiforgeryOptions::from_toml_str(r#"
///     cookie_name = "csrf"
///     header_name = "X-CSRF-Token"
/// "#).unwrap();
///
/// assert_eq!(options.cookie_name, "csrf");
/// assert_eq!(options.form_field_name, "__RequestVerificationToken");
/// assert_eq!(options.header_name.as_deref(), Some("X-CSRF-Token"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AntiforgeryOptions {
    /// Cookie holding the cookie token
    pub cookie_name: String,

    /// Form field holding the request token
    pub form_field_name: String,

    /// Header holding the request token; `None` disables header lookup
    pub header_name: Option<String>,

    /// Never read the form body to find the request token
    pub suppress_reading_token_from_form_body: bool,
}

impl Default for AntiforgeryOptions {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            form_field_name: DEFAULT_FORM_FIELD_NAME.to_string(),
            header_name: Some(DEFAULT_HEADER_NAME.to_string()),
            suppress_reading_token_from_form_body: false,
        }
    }
}

/// Error type for options loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`AntiforgeryOptions`]
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// The options parsed but are not usable
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

impl AntiforgeryOptions {
    /// Parses and validates options from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: AntiforgeryOptions = toml::from_str(content)?;
        options.validate().map_err(ConfigError::Validation)?;
        Ok(options)
    }

    /// Loads and validates options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that every configured name is usable.
    ///
    /// Returns all problems, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cookie_name.trim().is_empty() {
            errors.push("cookie_name must not be empty".to_string());
        }
        if self.form_field_name.trim().is_empty() {
            errors.push("form_field_name must not be empty".to_string());
        }
        if let Some(header) = &self.header_name {
            if http::HeaderName::from_bytes(header.as_bytes()).is_err() {
                errors.push(format!("header_name {header:?} is not a valid header name"));
            }
        }
        if self.header_name.is_none() && self.suppress_reading_token_from_form_body {
            errors.push(
                "header_name is required when reading the token from the form body is suppressed"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
