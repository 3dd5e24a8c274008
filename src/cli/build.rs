//! `build` command: compile every asset variant up front.
//!
//! With `--output`, each artifact is written under the output directory
//! (`<locale>/<route>` for localized assets) alongside a `manifest.json`
//! mapping routes to their versioned URLs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use assetline::asset::version;
use assetline::logger::ProgressLine;
use assetline::pipeline::{Pipeline, WarmReport};
use assetline::{debug, log};

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One compiled variant, as recorded in the manifest.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub url: String,
    pub file: PathBuf,
    pub etag: String,
    pub bytes: usize,
}

/// `route -> locale ("" when neutral) -> entry`.
pub type Manifest = BTreeMap<String, BTreeMap<String, ManifestEntry>>;

pub fn build(pipeline: &Pipeline, locales: &[String], output: Option<&Path>) -> Result<()> {
    let total = pipeline.variants(locales).len();
    let progress = ProgressLine::new(&[("compiled", total), ("failed", total)]);
    let reports = pipeline.warm_with(locales, |report| {
        progress.inc(if report.result.is_ok() { "compiled" } else { "failed" });
    });
    progress.finish();

    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(artifact) => log!(
                "compile";
                "{}{}  {} bytes  {}",
                report.route,
                locale_suffix(report),
                artifact.len(),
                artifact.etag()
            ),
            Err(e) => {
                failed += 1;
                log!("error"; "{}{}: {}", report.route, locale_suffix(report), e);
            }
        }
    }

    if let Some(dir) = output {
        let manifest = write_output(&reports, dir)?;
        log!("build"; "wrote {} routes to {}", manifest.len(), dir.display());
    }

    if failed > 0 {
        bail!("{failed} of {} variants failed to compile", reports.len());
    }
    Ok(())
}

fn locale_suffix(report: &WarmReport) -> String {
    report
        .locale
        .as_deref()
        .map(|l| format!(" [{l}]"))
        .unwrap_or_default()
}

/// Write every successful artifact plus the manifest under `dir`.
pub fn write_output(reports: &[WarmReport], dir: &Path) -> Result<Manifest> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut manifest = Manifest::new();
    for report in reports {
        let Ok(artifact) = &report.result else { continue };

        let file = output_file(&report.route, report.locale.as_deref());
        let path = dir.join(&file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &artifact.output()[..])
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("build"; "{}", path.display());

        manifest.entry(report.route.clone()).or_default().insert(
            report.locale.clone().unwrap_or_default(),
            ManifestEntry {
                url: version::versioned_url(&report.route, &artifact.version()),
                file,
                etag: artifact.etag(),
                bytes: artifact.len(),
            },
        );
    }

    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(manifest)
}

/// Relative output path: `/css/a.css` → `css/a.css`, `/` → `index`.
fn output_file(route: &str, locale: Option<&str>) -> PathBuf {
    let relative = route.trim_start_matches('/');
    let relative = if relative.is_empty() || relative.ends_with('/') {
        format!("{relative}index")
    } else {
        relative.to_string()
    };
    match locale {
        Some(locale) => Path::new(locale).join(relative),
        None => PathBuf::from(relative),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assetline::processor::StringTable;
    use assetline::source::MemorySource;
    use tempfile::TempDir;

    #[test]
    fn test_output_file() {
        assert_eq!(output_file("/css/a.css", None), PathBuf::from("css/a.css"));
        assert_eq!(output_file("/", None), PathBuf::from("index"));
        assert_eq!(output_file("/t.js", Some("fr")), PathBuf::from("fr/t.js"));
    }

    #[test]
    fn test_write_output() {
        let source = MemorySource::new()
            .with("a.css", "a { color: red; }")
            .with("t.js", "var t = \"{{title|Title}}\";");
        let mut pipeline = Pipeline::new(Arc::new(source));
        pipeline.add_inferred("/a.css", ["a.css"]).unwrap().minify();
        pipeline
            .add_inferred("/t.js", ["t.js"])
            .unwrap()
            .localize(Arc::new(StringTable::new().with("fr", "title", "Titre")));
        pipeline.add_inferred("/gone.js", ["gone.js"]).unwrap();

        let locales = vec!["en".to_string(), "fr".to_string()];
        let reports = pipeline.warm(&locales);
        let dir = TempDir::new().unwrap();
        let manifest = write_output(&reports, dir.path()).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("a.css")).unwrap(), "a{color:red}");
        assert_eq!(
            fs::read_to_string(dir.path().join("fr/t.js")).unwrap(),
            "var t = \"Titre\";"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("en/t.js")).unwrap(),
            "var t = \"Title\";"
        );
        assert!(!manifest.contains_key("/gone.js"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        let url = written["/a.css"][""]["url"].as_str().unwrap();
        assert!(url.starts_with("/a.css?v="));
        assert_eq!(written["/t.js"]["fr"]["file"], "fr/t.js");
    }
}
