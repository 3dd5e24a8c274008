//! Asset registry.
//!
//! A `Pipeline` is built during startup (`&mut` configuration phase), then
//! frozen into an `Arc<Pipeline>` and handed to the middleware. Routes are
//! append-only: there is no removal.

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::asset::{Asset, CompiledArtifact};
use crate::error::{CompileError, ConfigurationError};
use crate::source::SourceReader;
use crate::utils::mime;

pub struct Pipeline {
    reader: Arc<dyn SourceReader>,
    assets: Vec<Asset>,
    routes: FxHashMap<String, usize>,
}

/// Outcome of compiling one asset variant during warm-up.
#[derive(Debug)]
pub struct WarmReport {
    pub route: String,
    pub locale: Option<String>,
    pub result: Result<Arc<CompiledArtifact>, CompileError>,
}

impl Pipeline {
    /// Create an empty pipeline reading sources from `reader`.
    pub fn new(reader: Arc<dyn SourceReader>) -> Self {
        Self {
            reader,
            assets: Vec::new(),
            routes: FxHashMap::default(),
        }
    }

    /// Register an asset.
    ///
    /// Fails on a duplicate route, a route without leading `/`, or an
    /// empty source list.
    pub fn add<I, S>(
        &mut self,
        route: impl Into<String>,
        content_type: impl Into<String>,
        sources: I,
    ) -> Result<&mut Asset, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let route = route.into();
        if !route.starts_with('/') {
            return Err(ConfigurationError::InvalidRoute(route));
        }
        if self.routes.contains_key(&route) {
            return Err(ConfigurationError::DuplicateRoute(route));
        }
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        if sources.is_empty() {
            return Err(ConfigurationError::EmptySources(route));
        }

        let index = self.assets.len();
        self.routes.insert(route.clone(), index);
        self.assets.push(Asset::new(
            route,
            content_type.into(),
            sources,
            Arc::clone(&self.reader),
        ));
        Ok(&mut self.assets[index])
    }

    /// Register an asset, inferring the content type from the route.
    pub fn add_inferred<I, S>(
        &mut self,
        route: impl Into<String>,
        sources: I,
    ) -> Result<&mut Asset, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let route = route.into();
        let content_type = mime::from_route(&route);
        self.add(route, content_type, sources)
    }

    /// End the configuration phase.
    pub fn freeze(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn get(&self, route: &str) -> Option<&Asset> {
        self.routes.get(route).map(|&index| &self.assets[index])
    }

    /// Registered assets, in registration order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Compile every asset eagerly, in parallel.
    ///
    /// Locale-aware assets are compiled once per entry of `locales`.
    /// Failures are reported, not fatal.
    pub fn warm(&self, locales: &[String]) -> Vec<WarmReport> {
        self.warm_with(locales, |_| {})
    }

    /// Like [`warm`](Self::warm), calling `on_done` as each variant finishes.
    pub fn warm_with<F>(&self, locales: &[String], on_done: F) -> Vec<WarmReport>
    where
        F: Fn(&WarmReport) + Sync,
    {
        self.variants(locales)
            .into_par_iter()
            .map(|(asset, locale)| {
                let report = WarmReport {
                    route: asset.route().to_string(),
                    locale: locale.map(str::to_string),
                    result: asset.output(locale),
                };
                on_done(&report);
                report
            })
            .collect()
    }

    /// Every (asset, locale) pair warm-up would compile.
    pub fn variants<'a>(&'a self, locales: &'a [String]) -> Vec<(&'a Asset, Option<&'a str>)> {
        self.assets
            .iter()
            .flat_map(|asset| {
                if asset.is_localized() && !locales.is_empty() {
                    locales
                        .iter()
                        .map(|l| (asset, Some(l.as_str())))
                        .collect::<Vec<_>>()
                } else {
                    vec![(asset, None)]
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::StringTable;
    use crate::source::MemorySource;
    use crate::utils::mime::types;

    fn pipeline() -> Pipeline {
        let source = MemorySource::new()
            .with("a.js", "var a = 1;")
            .with("b.css", "b { margin: 0; }")
            .with("t.js", "var t = \"{{title}}\";");
        Pipeline::new(Arc::new(source))
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut p = pipeline();
        p.add("/app.js", types::JAVASCRIPT, ["a.js"]).unwrap();
        let err = p.add("/app.js", types::JAVASCRIPT, ["a.js"]).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateRoute("/app.js".into()));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_empty_sources_rejected() {
        let mut p = pipeline();
        let err = p.add("/app.js", types::JAVASCRIPT, Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptySources("/app.js".into()));
        assert!(p.get("/app.js").is_none());
    }

    #[test]
    fn test_relative_route_rejected() {
        let mut p = pipeline();
        let err = p.add("app.js", types::JAVASCRIPT, ["a.js"]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidRoute(_)));
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let mut p = pipeline();
        p.add_inferred("/b.css", ["b.css"]).unwrap().minify();
        p.add_inferred("/a.js", ["a.js"]).unwrap().minify();

        let routes: Vec<_> = p.assets().iter().map(Asset::route).collect();
        assert_eq!(routes, vec!["/b.css", "/a.js"]);
        assert_eq!(p.get("/b.css").unwrap().content_type(), types::CSS);
        assert_eq!(p.get("/a.js").unwrap().chain().describe(), vec!["minify-js"]);
    }

    #[test]
    fn test_warm_compiles_every_variant() {
        let mut p = pipeline();
        p.add_inferred("/a.js", ["a.js"]).unwrap().minify();
        p.add_inferred("/t.js", ["t.js"])
            .unwrap()
            .localize(Arc::new(StringTable::new().with("fr", "title", "Titre")));
        p.add_inferred("/broken.js", ["missing.js"]).unwrap();
        let p = p.freeze();

        let locales = vec!["en".to_string(), "fr".to_string()];
        let reports = p.warm(&locales);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports.iter().filter(|r| r.result.is_err()).count(), 1);
        assert_eq!(p.get("/t.js").unwrap().cached_variants(), vec!["en", "fr"]);
    }
}
