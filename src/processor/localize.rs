//! Localization token substitution.
//!
//! Token grammar: `{{key}}` or `{{key|fallback text}}`. Keys are made of
//! ASCII letters, digits, `_`, `-` and `.`.
//!
//! Each token is resolved through the injected [`Lookup`] for the request's
//! locale, then for its primary subtag (`fr-CA` → `fr`). Misses fall back to
//! the token's fallback text, or to the key itself when the token declares
//! none. A miss never fails the chain.
//!
//! For JavaScript assets, looked-up strings are escaped so they stay inside
//! whatever string literal the token sits in.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use rustc_hash::FxHashMap;

use super::{ProcessContext, Processor};
use crate::debug;
use crate::error::ProcessingError;
use crate::utils::mime;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{[ \t]*([A-Za-z0-9_.\-]+)[ \t]*(?:\|([^}]*))?\}\}").expect("valid token regex")
});

/// Localization backend capability.
pub trait Lookup: Send + Sync {
    fn lookup(&self, key: &str, locale: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, key: &str, locale: &str) -> Option<String> {
        self(key, locale)
    }
}

/// Locale → key → string table.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    locales: FxHashMap<String, FxHashMap<String, String>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locale: impl Into<String>, key: impl Into<String>, value: impl Into<String>) {
        self.locales
            .entry(locale.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn with(mut self, locale: &str, key: &str, value: &str) -> Self {
        self.insert(locale, key, value);
        self
    }

    /// Locales with at least one string, sorted.
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<_> = self.locales.keys().cloned().collect();
        locales.sort();
        locales
    }
}

impl Lookup for StringTable {
    fn lookup(&self, key: &str, locale: &str) -> Option<String> {
        self.locales.get(locale)?.get(key).cloned()
    }
}

/// Substitutes localization tokens for the request's locale.
#[derive(Clone)]
pub struct Localizer {
    lookup: Arc<dyn Lookup>,
}

impl Localizer {
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }

    fn resolve(&self, key: &str, locale: &str) -> Option<String> {
        self.lookup.lookup(key, locale).or_else(|| {
            let (primary, _) = locale.split_once(['-', '_'])?;
            self.lookup.lookup(key, primary)
        })
    }

    /// Replace every token in `text`.
    pub fn localize(&self, text: &str, route: &str, locale: Option<&str>) -> String {
        self.substitute(text, route, locale, |value| value)
    }

    fn substitute(
        &self,
        text: &str,
        route: &str,
        locale: Option<&str>,
        escape: impl Fn(String) -> String,
    ) -> String {
        let mut misses = 0usize;
        let out = TOKEN.replace_all(text, |caps: &Captures<'_>| {
            let key = &caps[1];
            let resolved = locale.and_then(|locale| self.resolve(key, locale));
            match resolved {
                Some(value) => escape(value),
                None => {
                    misses += 1;
                    debug!("localize"; "{}: `{}` unresolved for locale {:?}", route, key, locale);
                    caps.get(2)
                        .map_or_else(|| key.to_string(), |m| m.as_str().trim().to_string())
                }
            }
        });
        if misses > 0 {
            debug!("localize"; "{}: {} token(s) fell back", route, misses);
        }
        out.into_owned()
    }
}

impl Processor for Localizer {
    fn name(&self) -> &str {
        "localize"
    }

    fn uses_locale(&self) -> bool {
        true
    }

    fn process(&self, input: String, ctx: &ProcessContext<'_>) -> Result<String, ProcessingError> {
        let out = if mime::is_javascript(ctx.content_type) {
            self.substitute(&input, ctx.route, ctx.locale, |value| escape_js(&value))
        } else {
            self.localize(&input, ctx.route, ctx.locale)
        };
        Ok(out)
    }
}

/// Escape text for any JS string literal (`'`, `"` or template).
pub fn escape_js(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '<' => out.push_str("\\x3c"),
            c => out.push(c),
        }
    }
    out
}

impl std::fmt::Debug for Localizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizer").finish_non_exhaustive()
    }
}
