//! MIME type detection utilities.
//!
//! Assets may omit a content type; it is then inferred from the route's
//! extension.

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const SVG: &str = "image/svg+xml";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Guess MIME type from a route or file name.
///
/// Returns a full MIME type string suitable for HTTP Content-Type header.
pub fn from_route(route: &str) -> &'static str {
    let name = route.rsplit('/').next().unwrap_or(route);
    from_extension(name.rsplit_once('.').map(|(_, ext)| ext))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json" | "map") => types::JSON,
        Some("xml") => types::XML,
        Some("svg") => types::SVG,
        Some("txt") => types::PLAIN,
        _ => types::OCTET_STREAM,
    }
}

/// Strip parameters: `text/css; charset=utf-8` → `text/css`.
fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Check if the MIME type is JavaScript.
pub fn is_javascript(mime: &str) -> bool {
    matches!(
        essence(mime),
        "text/javascript" | "application/javascript" | "application/x-javascript"
    )
}

/// Check if the MIME type is CSS.
pub fn is_css(mime: &str) -> bool {
    essence(mime) == "text/css"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_route() {
        assert_eq!(from_route("/bundle.js"), types::JAVASCRIPT);
        assert_eq!(from_route("/css/site.css"), types::CSS);
        assert_eq!(from_route("/v1.2/data.json"), types::JSON);
        assert_eq!(from_route("/noext"), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_javascript() {
        assert!(is_javascript(types::JAVASCRIPT));
        assert!(is_javascript("application/javascript"));
        assert!(!is_javascript(types::CSS));
    }

    #[test]
    fn test_is_css() {
        assert!(is_css(types::CSS));
        assert!(is_css("text/css"));
        assert!(!is_css(types::HTML));
    }
}
