//! Router-independent response.

use std::sync::Arc;

use crate::utils::mime::types::PLAIN;

#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Arc<[u8]>,
}

impl AssetResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Arc::from(&[][..]),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_body(mut self, body: Arc<[u8]>) -> Self {
        self.body = body;
        self
    }

    /// Plain-text response, e.g. for errors.
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        let body: Vec<u8> = message.into().into_bytes();
        Self::new(status)
            .with_header("Content-Type", PLAIN)
            .with_body(body.into())
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::text(405, "405 Method Not Allowed").with_header("Allow", "GET, HEAD")
    }

    /// First value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drop the body, keep headers (HEAD requests).
    pub fn without_body(mut self) -> Self {
        self.body = Arc::from(&[][..]);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let res = AssetResponse::text(500, "boom");
        assert_eq!(res.status, 500);
        assert_eq!(res.header("content-type"), Some(PLAIN));
        assert_eq!(&*res.body, b"boom");
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let res = AssetResponse::method_not_allowed();
        assert_eq!(res.status, 405);
        assert_eq!(res.header("Allow"), Some("GET, HEAD"));
    }
}
