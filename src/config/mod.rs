//! Pipeline configuration from `assetline.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Section definitions
//! │   ├── asset      # [[asset]]
//! │   ├── locale     # [locale], [locale.strings.*]
//! │   └── serve      # [serve]
//! ├── error          # ConfigError, ConfigDiagnostics
//! └── mod.rs         # AssetlineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section            | Purpose                                      |
//! |--------------------|----------------------------------------------|
//! | `[serve]`          | HTTP server (interface, port, workers)       |
//! | `[source]`         | Source root directory                        |
//! | `[locale]`         | Locale selection and bundled strings         |
//! | `[[asset]]`        | One entry per served route                   |

mod error;
pub mod section;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{AssetConfig, LocaleConfig, MinifyMode, ServeConfig, SourceConfig};

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::log;
use crate::middleware::ServeOptions;
use crate::pipeline::Pipeline;
use crate::processor::Lookup;
use crate::source::FsSource;

/// Default config file name.
pub const CONFIG_FILE: &str = "assetline.toml";

/// Root configuration structure representing assetline.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetlineConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory containing the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub locale: LocaleConfig,

    #[serde(default)]
    pub asset: Vec<AssetConfig>,
}

impl AssetlineConfig {
    /// Load and validate configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = path.to_path_buf();
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Directory source identifiers resolve against.
    pub fn source_root(&self) -> PathBuf {
        match &self.source.root {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Apply `serve` command-line overrides.
    pub fn apply_serve_options(&mut self, interface: Option<IpAddr>, port: Option<u16>) {
        if let Some(interface) = interface {
            self.serve.interface = interface;
        }
        if let Some(port) = port {
            self.serve.port = port;
        }
    }

    pub fn serve_options(&self) -> ServeOptions {
        ServeOptions {
            locale: self.locale.options(),
            max_age: self.serve.max_age,
        }
    }

    /// Locales compiled by warm-up.
    pub fn locales(&self) -> Vec<String> {
        self.locale.locales()
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        self.locale.validate(&mut diag);

        let source_root = self.source_root();
        if !source_root.is_dir() {
            diag.error_with_hint(
                "source.root",
                format!("`{}` is not a directory", source_root.display()),
                "paths are relative to the config file",
            );
        }

        let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
        for (index, asset) in self.asset.iter().enumerate() {
            asset.validate(index, &mut diag);
            if let Some(first) = seen.insert(asset.route.as_str(), index) {
                diag.error(
                    format!("asset[{index}].route"),
                    format!("`{}` already declared by asset[{first}]", asset.route),
                );
            }
        }
        if self.asset.is_empty() {
            diag.warn("asset", "no assets declared");
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    // ========================================================================
    // pipeline
    // ========================================================================

    /// Register every `[[asset]]` on a new pipeline reading from
    /// [`source_root`](Self::source_root).
    pub fn build_pipeline(&self) -> Result<Pipeline, ConfigurationError> {
        let mut pipeline = Pipeline::new(Arc::new(FsSource::new(self.source_root())));
        let strings: Arc<dyn Lookup> = Arc::new(self.locale.string_table());

        for entry in &self.asset {
            let asset = pipeline.add(
                entry.route.as_str(),
                entry.content_type(),
                entry.sources.iter().cloned(),
            )?;
            // Localize first so the minifier parses the substituted text.
            if entry.localize {
                asset.localize(Arc::clone(&strings));
            }
            if let Some(minifier) = entry.minifier() {
                asset.add_processor(minifier);
            }
        }
        Ok(pipeline)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AssetlineConfig {
    let (parsed, ignored) = AssetlineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
