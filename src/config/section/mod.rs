//! Configuration section definitions.

mod asset;
mod locale;
mod serve;

pub use asset::{AssetConfig, MinifyMode};
pub use locale::LocaleConfig;
pub use serve::ServeConfig;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `[source]`: where source identifiers resolve.
///
/// ```toml
/// [source]
/// root = "assets"             # relative to the config file
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Defaults to the config file's directory.
    pub root: Option<PathBuf>,
}
