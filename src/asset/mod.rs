//! Assets: routable bundles of source files plus their processor chain.
//!
//! # Compile flow
//!
//! ```text
//! output(locale)
//!   ├─ read sources (parallel, ordered)
//!   ├─ fingerprint = hash(sources + chain settings + locale)
//!   ├─ cache hit  → installed artifact
//!   └─ cache miss → run chain once (coalesced) → install → artifact
//! ```
//!
//! Staleness is checked on every access; there is no file watcher.

mod artifact;
mod cache;
pub mod version;

pub use artifact::CompiledArtifact;
pub use cache::{CompileCache, CompileResult};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::debug;
use crate::error::CompileError;
use crate::freshness::{ContentHash, Fingerprinter};
use crate::processor::{Localizer, Lookup, Minifier, ProcessContext, Processor, ProcessorChain, Stage};
use crate::source::{self, SourceReader};

/// A registered asset. Created by `Pipeline::add`.
pub struct Asset {
    route: String,
    content_type: String,
    sources: Vec<String>,
    chain: ProcessorChain,
    reader: Arc<dyn SourceReader>,
    cache: CompileCache,
    compiles: AtomicUsize,
}

impl Asset {
    pub(crate) fn new(
        route: String,
        content_type: String,
        sources: Vec<String>,
        reader: Arc<dyn SourceReader>,
    ) -> Self {
        Self {
            route,
            content_type,
            sources,
            chain: ProcessorChain::new(),
            reader,
            cache: CompileCache::new(),
            compiles: AtomicUsize::new(0),
        }
    }

    // ========================================================================
    // Configuration (requires `&mut`, i.e. before the pipeline is frozen)
    // ========================================================================

    /// Append a post-processor (runs on the concatenated text).
    pub fn add_processor(&mut self, step: impl Processor + 'static) -> &mut Self {
        self.chain.push(Stage::Post, Arc::new(step));
        self
    }

    /// Append a pre-processor (runs on each source file).
    pub fn add_pre_processor(&mut self, step: impl Processor + 'static) -> &mut Self {
        self.chain.push(Stage::Pre, Arc::new(step));
        self
    }

    /// Append the minifier matching this asset's content type, if any.
    pub fn minify(&mut self) -> &mut Self {
        match Minifier::for_content_type(&self.content_type) {
            Some(minifier) => self.add_processor(minifier),
            None => {
                debug!("config"; "{}: no minifier for `{}`", self.route, self.content_type);
                self
            }
        }
    }

    /// Append a localizer backed by `lookup`; makes the asset locale-aware.
    pub fn localize(&mut self, lookup: Arc<dyn Lookup>) -> &mut Self {
        self.add_processor(Localizer::new(lookup))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    pub fn is_localized(&self) -> bool {
        self.chain.uses_locale()
    }

    /// Number of times the processor chain has run.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    /// Locale variants with a cached artifact (`""` = locale-neutral).
    pub fn cached_variants(&self) -> Vec<String> {
        self.cache.variants()
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Current compiled output, recompiling if any input changed.
    ///
    /// `locale` is ignored unless the asset is locale-aware.
    pub fn output(&self, locale: Option<&str>) -> CompileResult {
        let locale = self.effective_locale(locale);
        let texts = source::read_all(self.reader.as_ref(), &self.sources)?;
        let fingerprint = self.source_fingerprint(&texts, locale);

        self.cache
            .get_or_compile(locale.unwrap_or_default(), fingerprint, || {
                self.compile(texts, locale)
            })
    }

    /// Last installed artifact without checking sources.
    pub fn cached(&self, locale: Option<&str>) -> Option<Arc<CompiledArtifact>> {
        self.cache
            .current(self.effective_locale(locale).unwrap_or_default())
    }

    /// `route?v=<version>` for the current output.
    pub fn versioned_url(&self, locale: Option<&str>) -> Result<String, CompileError> {
        let artifact = self.output(locale)?;
        Ok(version::versioned_url(&self.route, &artifact.version()))
    }

    fn effective_locale<'a>(&self, locale: Option<&'a str>) -> Option<&'a str> {
        locale.filter(|_| self.is_localized())
    }

    fn source_fingerprint(&self, texts: &[String], locale: Option<&str>) -> ContentHash {
        let mut fp = Fingerprinter::new();
        fp.field("content-type", &self.content_type);
        for (id, text) in self.sources.iter().zip(texts) {
            fp.field("id", id).field("source", text);
        }
        self.chain.fingerprint_into(&mut fp);
        if let Some(locale) = locale {
            fp.field("locale", locale);
        }
        fp.finish()
    }

    fn compile(&self, texts: Vec<String>, locale: Option<&str>) -> Result<Vec<u8>, CompileError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        let ctx = ProcessContext {
            route: &self.route,
            content_type: &self.content_type,
            locale,
        };
        let output = self.chain.run(texts, &ctx)?;
        debug!(
            "compile";
            "{}{} in {:.1?} ({} bytes)",
            self.route,
            locale.map(|l| format!(" [{l}]")).unwrap_or_default(),
            start.elapsed(),
            output.len()
        );
        Ok(output.into_bytes())
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset")
            .field("route", &self.route)
            .field("content_type", &self.content_type)
            .field("sources", &self.sources)
            .field("chain", &self.chain)
            .field("localized", &self.is_localized())
            .finish()
    }
}
