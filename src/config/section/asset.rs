//! `[[asset]]` entries.
//!
//! # Example
//!
//! ```toml
//! [[asset]]
//! route = "/bundle.js"
//! sources = ["js/a.js", "js/b.js"]
//! minify = "auto"             # auto | js | css | none
//! localize = true
//!
//! [[asset]]
//! route = "/theme"
//! content_type = "text/css"
//! sources = ["css/theme.css"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::processor::Minifier;
use crate::utils::mime;

/// Which minifier an asset runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinifyMode {
    /// Pick by content type; no-op for types without a minifier.
    #[default]
    Auto,
    Js,
    Css,
    None,
}

impl MinifyMode {
    pub fn minifier(self, content_type: &str) -> Option<Minifier> {
        match self {
            Self::Auto => Minifier::for_content_type(content_type),
            Self::Js => Some(Minifier::Js),
            Self::Css => Some(Minifier::Css),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub route: String,

    /// Inferred from the route's extension when absent.
    #[serde(default)]
    pub content_type: Option<String>,

    pub sources: Vec<String>,

    #[serde(default)]
    pub minify: MinifyMode,

    #[serde(default)]
    pub localize: bool,
}

impl AssetConfig {
    pub fn content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| mime::from_route(&self.route).to_string())
    }

    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = |name: &str| format!("asset[{index}].{name}");

        if !self.route.starts_with('/') {
            diag.error_with_hint(
                field("route"),
                format!("`{}` must start with `/`", self.route),
                format!("use `/{}`", self.route),
            );
        }
        if self.sources.is_empty() {
            diag.error(field("sources"), "must list at least one source");
        }
        if self.sources.iter().any(|s| s.trim().is_empty()) {
            diag.error(field("sources"), "source identifiers must not be empty");
        }
        if self.content_type.is_none() && mime::from_route(&self.route) == mime::types::OCTET_STREAM {
            diag.warn(
                field("content_type"),
                format!("cannot infer from `{}`, serving as {}", self.route, mime::types::OCTET_STREAM),
            );
        }
        if self.minify == MinifyMode::Auto
            && self.minifier().is_none()
            && self.content_type.is_some()
        {
            diag.warn(field("minify"), "no minifier for this content type");
        }
    }

    pub fn minifier(&self) -> Option<Minifier> {
        self.minify.minifier(&self.content_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::utils::mime::types;

    #[test]
    fn test_asset_entries() {
        let config = test_parse_config(
            r#"
[[asset]]
route = "/bundle.js"
sources = ["a.js", "b.js"]

[[asset]]
route = "/theme"
content_type = "text/css"
sources = ["theme.css"]
minify = "none"
localize = true
"#,
        );
        assert_eq!(config.asset.len(), 2);

        let bundle = &config.asset[0];
        assert_eq!(bundle.content_type(), types::JAVASCRIPT);
        assert_eq!(bundle.minify, MinifyMode::Auto);
        assert_eq!(bundle.minifier(), Some(Minifier::Js));
        assert!(!bundle.localize);

        let theme = &config.asset[1];
        assert_eq!(theme.content_type(), "text/css");
        assert_eq!(theme.minifier(), None);
        assert!(theme.localize);
    }

    #[test]
    fn test_asset_validation() {
        let config = test_parse_config("[[asset]]\nroute = \"app.js\"\nsources = []");
        let mut diag = ConfigDiagnostics::new();
        config.asset[0].validate(0, &mut diag);

        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["asset[0].route", "asset[0].sources"]);
    }

    #[test]
    fn test_unknown_content_type_warns() {
        let config = test_parse_config("[[asset]]\nroute = \"/data.bin\"\nsources = [\"d\"]");
        let mut diag = ConfigDiagnostics::new();
        config.asset[0].validate(0, &mut diag);
        assert!(diag.is_empty());
        assert_eq!(diag.warnings().len(), 1);
    }
}
