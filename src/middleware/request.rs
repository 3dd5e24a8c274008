//! Incoming request view and per-request context.

use std::time::SystemTime;

use percent_encoding::percent_decode_str;

use crate::asset::{Asset, CompiledArtifact};

/// HTTP method, as far as asset serving cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Router-independent request: method, target URL and headers.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
}

impl AssetRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL path without query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.url.find(['?', '#']).unwrap_or(self.url.len());
        &self.url[..end]
    }

    /// First value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Percent-decoded value of the first matching query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.url.split_once('?')?.1;
        let query = query.split('#').next().unwrap_or(query);
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then(|| percent_decode_str(value).decode_utf8_lossy().into_owned())
        })
    }
}

/// Client-supplied conditional-request validators.
#[derive(Debug, Clone, Default)]
pub struct Validators {
    /// Entity tags from `If-None-Match`; `*` kept as-is.
    pub if_none_match: Option<Vec<String>>,
    pub if_modified_since: Option<SystemTime>,
}

impl Validators {
    pub fn from_request(request: &AssetRequest) -> Self {
        Self {
            if_none_match: request.header("If-None-Match").map(parse_etag_list),
            if_modified_since: request
                .header("If-Modified-Since")
                .and_then(|v| httpdate::parse_http_date(v.trim()).ok()),
        }
    }

    /// Whether the client's cached copy is still current.
    ///
    /// `If-None-Match` takes precedence; `If-Modified-Since` is only
    /// consulted without it.
    pub fn matches(&self, artifact: &CompiledArtifact) -> bool {
        if let Some(tags) = &self.if_none_match {
            let current = artifact.etag();
            return tags.iter().any(|tag| tag == "*" || weak_eq(tag, &current));
        }
        self.if_modified_since
            .is_some_and(|since| artifact.compiled_at() <= since)
    }
}

fn parse_etag_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Weak comparison: `W/"x"` matches `"x"`.
fn weak_eq(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

/// How the requested locale is picked for locale-aware assets.
///
/// Requested tags are clamped to `supported` (plus `default`), so the set of
/// cached variants per asset stays bounded whatever clients send.
#[derive(Debug, Clone)]
pub struct LocaleOptions {
    pub default: String,
    pub query_param: String,
    /// Locales with their own variant. `default` is always accepted.
    pub supported: Vec<String>,
}

impl Default for LocaleOptions {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            query_param: "lang".to_string(),
            supported: Vec::new(),
        }
    }
}

impl LocaleOptions {
    pub fn with_supported<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported = locales.into_iter().map(Into::into).collect();
        self
    }

    /// Query parameter, then `Accept-Language` tags in order, then the
    /// default. The first candidate that maps to a known locale wins.
    pub fn resolve(&self, request: &AssetRequest) -> String {
        let query = request
            .query_param(&self.query_param)
            .filter(|l| !l.is_empty());
        let header = request
            .header("Accept-Language")
            .map(languages)
            .unwrap_or_default();

        query
            .iter()
            .map(String::as_str)
            .chain(header)
            .find_map(|tag| self.known(tag))
            .unwrap_or_else(|| self.default.clone())
    }

    /// Exact tag, then its primary subtag, matched case-insensitively.
    fn known(&self, tag: &str) -> Option<String> {
        let primary = tag.split(['-', '_']).next().unwrap_or(tag);
        [tag, primary].into_iter().find_map(|candidate| {
            std::iter::once(&self.default)
                .chain(&self.supported)
                .find(|locale| locale.eq_ignore_ascii_case(candidate))
                .cloned()
        })
    }
}

/// `Accept-Language` tags in header order, without weights or `*`.
fn languages(header: &str) -> Vec<&str> {
    header
        .split(',')
        .map(|part| part.split(';').next().unwrap_or(part).trim())
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .collect()
}

/// Everything one request needs once its asset is resolved.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub asset: &'a Asset,
    pub locale: Option<String>,
    pub validators: Validators,
    /// Version pinned by the URL (`?v=`), if any.
    pub version: Option<String>,
    pub head: bool,
}
