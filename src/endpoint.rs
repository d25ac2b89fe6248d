//! Matched-route descriptor produced by the routing layer.
//!
//! Metadata is built once when a route is registered and shared read-only
//! across every request to that route.

use std::sync::Arc;

use crate::form::FormLimitsOverride;

/// Antiforgery requirement declared by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiforgeryMetadata {
    /// Whether requests to the route must carry a valid token pair
    pub requires_validation: bool,
}

/// A single capability record attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataEntry {
    /// Antiforgery requirement
    Antiforgery(AntiforgeryMetadata),
    /// Form reading limits
    FormLimits(FormLimitsOverride),
}

impl From<AntiforgeryMetadata> for MetadataEntry {
    fn from(metadata: AntiforgeryMetadata) -> Self {
        MetadataEntry::Antiforgery(metadata)
    }
}

impl From<FormLimitsOverride> for MetadataEntry {
    fn from(limits: FormLimitsOverride) -> Self {
        MetadataEntry::FormLimits(limits)
    }
}

/// Immutable metadata of a route.
///
/// Each capability is optional. Attaching the same capability twice keeps
/// the last one, mirroring how the innermost declaration wins.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{FormLimitsOverride, RequireAntiforgeryToken, RouteMetadata};
///
/// let metadata = RouteMetadata::new()
///     .with(RequireAntiforgeryToken)
///     .with(FormLimitsOverride { value_count_limit: 2, ..Default::default() });
///
/// assert!(metadata.antiforgery().unwrap().requires_validation);
/// assert_eq!(metadata.form_limits().unwrap().value_count_limit, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMetadata {
    antiforgery: Option<AntiforgeryMetadata>,
    form_limits: Option<FormLimitsOverride>,
}

impl RouteMetadata {
    /// Creates metadata with no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a capability record, replacing any earlier record of the same kind.
    pub fn with(mut self, entry: impl Into<MetadataEntry>) -> Self {
        match entry.into() {
            MetadataEntry::Antiforgery(metadata) => self.antiforgery = Some(metadata),
            MetadataEntry::FormLimits(limits) => self.form_limits = Some(limits),
        }
        self
    }

    /// Returns the antiforgery requirement, if declared.
    pub fn antiforgery(&self) -> Option<&AntiforgeryMetadata> {
        self.antiforgery.as_ref()
    }

    /// Returns the form limits override, if declared.
    pub fn form_limits(&self) -> Option<&FormLimitsOverride> {
        self.form_limits.as_ref()
    }
}

/// A route matched for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    display_name: String,
    metadata: RouteMetadata,
}

impl Endpoint {
    /// Creates an endpoint descriptor.
    pub fn new(display_name: impl Into<String>, metadata: RouteMetadata) -> Self {
        Self {
            display_name: display_name.into(),
            metadata,
        }
    }

    /// Convenience for wrapping the endpoint for sharing across requests.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns the route name used in diagnostics.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the route metadata.
    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }
}
