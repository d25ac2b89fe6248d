use crate::endpoint::{AntiforgeryMetadata, MetadataEntry, RouteMetadata};

/// Determines whether a route requires antiforgery validation.
///
/// Returns `false` when no route matched. A matched route is validated only
/// if it explicitly opts in; routes without an antiforgery declaration are
/// not protected by the gate.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::{requires_validation, DisableAntiforgery, RequireAntiforgeryToken, RouteMetadata};
///
/// assert!(!requires_validation(None));
/// assert!(!requires_validation(Some(&RouteMetadata::new())));
/// assert!(requires_validation(Some(&RouteMetadata::new().with(RequireAntiforgeryToken))));
/// assert!(!requires_validation(Some(&RouteMetadata::new().with(DisableAntiforgery))));
/// ```
pub fn requires_validation(route: Option<&RouteMetadata>) -> bool {
    matches!(
        route.and_then(RouteMetadata::antiforgery),
        Some(AntiforgeryMetadata {
            requires_validation: true
        })
    )
}

/// Route marker requiring a valid antiforgery token pair.
///
/// Use this on endpoints that accept state-changing form posts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAntiforgeryToken;

/// Route marker opting out of antiforgery validation.
///
/// Use this to override a requirement declared at a broader scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisableAntiforgery;

// Conversions to route metadata
impl From<RequireAntiforgeryToken> for MetadataEntry {
    fn from(_: RequireAntiforgeryToken) -> Self {
        MetadataEntry::Antiforgery(AntiforgeryMetadata {
            requires_validation: true,
        })
    }
}

impl From<DisableAntiforgery> for MetadataEntry {
    fn from(_: DisableAntiforgery) -> Self {
        MetadataEntry::Antiforgery(AntiforgeryMetadata {
            requires_validation: false,
        })
    }
}
