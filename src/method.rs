//! Classification of HTTP methods that may carry a state-changing form.
//!
//! Only these methods are subject to antiforgery validation. Safe methods
//! (`GET`, `HEAD`, `OPTIONS`, `TRACE`) and `CONNECT` pass through untouched.

use http::Method;

const FORM_BEARING: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

/// Returns `true` if requests with this method may submit a form.
///
/// The comparison is ASCII case-insensitive, so extension methods built from
/// lowercase bytes are classified the same as their canonical form.
///
/// # Examples
///
/// ```
/// use antiforgery_gate::is_form_bearing;
/// use http::Method;
///
/// assert!(is_form_bearing(&Method::POST));
/// assert!(is_form_bearing(&Method::DELETE));
/// assert!(!is_form_bearing(&Method::GET));
/// assert!(!is_form_bearing(&Method::OPTIONS));
/// ```
pub fn is_form_bearing(method: &Method) -> bool {
    is_form_bearing_str(method.as_str())
}

/// String form of [`is_form_bearing`].
///
/// # Examples
///
/// ```
/// use antiforgery_gate::is_form_bearing_str;
///
/// assert!(is_form_bearing_str("patch"));
/// assert!(!is_form_bearing_str("head"));
/// assert!(!is_form_bearing_str(""));
/// ```
pub fn is_form_bearing_str(method: &str) -> bool {
    FORM_BEARING
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(method))
}
