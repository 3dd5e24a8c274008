//! `[locale]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [locale]
//! default = "en"
//! query_param = "lang"
//!
//! [locale.strings.fr]
//! greeting = "Bonjour"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::middleware::LocaleOptions;
use crate::processor::StringTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Locale used when a request names none.
    pub default: String,

    /// Query parameter that selects a locale explicitly.
    pub query_param: String,

    /// `locale -> key -> text`.
    pub strings: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let options = LocaleOptions::default();
        Self {
            default: options.default,
            query_param: options.query_param,
            strings: BTreeMap::new(),
        }
    }
}

impl LocaleConfig {
    pub fn options(&self) -> LocaleOptions {
        LocaleOptions {
            default: self.default.clone(),
            query_param: self.query_param.clone(),
            supported: self.locales(),
        }
    }

    /// Bundled lookup table built from `[locale.strings.*]`.
    pub fn string_table(&self) -> StringTable {
        let mut table = StringTable::new();
        for (locale, entries) in &self.strings {
            for (key, value) in entries {
                table.insert(locale.as_str(), key.as_str(), value.as_str());
            }
        }
        table
    }

    /// Default locale first, then every locale with strings.
    pub fn locales(&self) -> Vec<String> {
        let mut locales = vec![self.default.clone()];
        locales.extend(self.strings.keys().filter(|l| **l != self.default).cloned());
        locales
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.default.trim().is_empty() {
            diag.error("locale.default", "must not be empty");
        }
        if self.query_param.trim().is_empty() {
            diag.error("locale.query_param", "must not be empty");
        }
    }
}
