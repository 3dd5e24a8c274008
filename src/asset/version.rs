//! Version strings for cache busting.
//!
//! A version is the first 8 hex chars of the content fingerprint. When the
//! compiled output changes, so does the version, and browsers re-fetch.

/// Query parameter carrying the version.
pub const VERSION_PARAM: &str = "v";

/// Build `route?v=abc12345`.
pub fn versioned_url(route: &str, version: &str) -> String {
    let sep = if route.contains('?') { '&' } else { '?' };
    format!("{route}{sep}{VERSION_PARAM}={version}")
}

/// Whether a requested version pins the current output.
pub fn is_current(requested: Option<&str>, current: &str) -> bool {
    requested.is_some_and(|v| v == current)
}
