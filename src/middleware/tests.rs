//! Request-level scenarios: registration through response.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use super::*;
use crate::error::ProcessingError;
use crate::processor::{ProcessContext, Processor, StringTable};
use crate::source::MemorySource;
use crate::utils::mime::types;

/// Passes text through slowly, counting invocations.
struct Slow {
    calls: Arc<AtomicUsize>,
}

impl Processor for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn process(&self, input: String, _: &ProcessContext<'_>) -> Result<String, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(150));
        Ok(input)
    }
}

fn middleware(pipeline: Pipeline) -> AssetMiddleware {
    AssetMiddleware::new(pipeline.freeze(), ServeOptions::default())
}

fn localized_middleware(pipeline: Pipeline, supported: &[&str]) -> AssetMiddleware {
    let options = ServeOptions {
        locale: LocaleOptions::default().with_supported(supported.iter().copied()),
        ..ServeOptions::default()
    };
    AssetMiddleware::new(pipeline.freeze(), options)
}

fn body(res: &AssetResponse) -> &str {
    std::str::from_utf8(&res.body).unwrap()
}

#[test]
fn test_bundle_end_to_end() {
    let source = MemorySource::new()
        .with("a.js", "var a=1;")
        .with("b.js", "var b=2;");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline
        .add("/bundle.js", types::JAVASCRIPT, ["a.js", "b.js"])
        .unwrap()
        .minify();
    let mw = middleware(pipeline);

    let first = mw.handle(&AssetRequest::get("/bundle.js"));
    assert_eq!(first.status, 200);
    assert_eq!(first.header("Content-Type"), Some(types::JAVASCRIPT));
    let minified = body(&first);
    assert!(minified.contains("a=1"), "{minified}");
    assert!(minified.contains("b=2"), "{minified}");
    // Output parses again: valid JS.
    assert!(crate::processor::minify::minify_js(minified).is_ok());

    let etag = first.header("ETag").unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));

    let second = mw.handle(&AssetRequest::get("/bundle.js"));
    assert_eq!(second.status, 200);
    assert_eq!(second.header("ETag"), Some(etag.as_str()));

    let third = mw.handle(&AssetRequest::get("/bundle.js").with_header("If-None-Match", etag.clone()));
    assert_eq!(third.status, 304);
    assert!(third.body.is_empty());
    assert_eq!(third.header("ETag"), Some(etag.as_str()));

    assert_eq!(mw.pipeline().get("/bundle.js").unwrap().compile_count(), 1);
}

#[test]
fn test_stale_validator_gets_full_body() {
    let source = Arc::new(MemorySource::new().with("a.css", "a { color: red; }"));
    let mut pipeline = Pipeline::new(Arc::clone(&source) as Arc<dyn crate::source::SourceReader>);
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap().minify();
    let mw = middleware(pipeline);

    let old = mw.handle(&AssetRequest::get("/a.css"));
    let old_etag = old.header("ETag").unwrap().to_string();
    assert_eq!(body(&old), "a{color:red}");

    source.set("a.css", "a { color: blue; }");
    let res = mw.handle(&AssetRequest::get("/a.css").with_header("If-None-Match", old_etag.clone()));
    assert_eq!(res.status, 200);
    assert_ne!(res.header("ETag"), Some(old_etag.as_str()));
    assert!(body(&res).starts_with("a{color:"));
    assert_ne!(body(&res), "a{color:red}");
}

#[test]
fn test_source_change_during_burst_compiles_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(MemorySource::new().with("a.js", "var a = 1;"));
    let mut pipeline = Pipeline::new(Arc::clone(&source) as Arc<dyn crate::source::SourceReader>);
    pipeline
        .add_inferred("/a.js", ["a.js"])
        .unwrap()
        .add_processor(Slow {
            calls: Arc::clone(&calls),
        });
    let mw = Arc::new(middleware(pipeline));

    assert_eq!(mw.handle(&AssetRequest::get("/a.js")).status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    source.set("a.js", "var a = 2;");
    let barrier = Arc::new(Barrier::new(10));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let (mw, barrier) = (Arc::clone(&mw), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                mw.handle(&AssetRequest::get("/a.js"))
            })
        })
        .collect();
    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let etag = responses[0].header("ETag").unwrap();
    for res in &responses {
        assert_eq!(res.status, 200);
        assert_eq!(res.header("ETag"), Some(etag));
        assert_eq!(body(res), "var a = 2;");
    }
}

#[test]
fn test_localized_variants() {
    let source = MemorySource::new().with("hello.js", "var msg = \"{{greeting|Hello}}\";");
    let table = StringTable::new().with("fr", "greeting", "Bonjour");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline
        .add_inferred("/hello.js", ["hello.js"])
        .unwrap()
        .localize(Arc::new(table));
    let mw = localized_middleware(pipeline, &["fr"]);

    let fr = mw.handle(&AssetRequest::get("/hello.js?lang=fr"));
    assert_eq!(fr.status, 200);
    assert!(body(&fr).contains("Bonjour"));
    assert_eq!(fr.header("Vary"), Some("Accept-Language"));

    let xx = mw.handle(&AssetRequest::get("/hello.js").with_header("Accept-Language", "xx"));
    assert_eq!(xx.status, 200);
    assert!(body(&xx).contains("Hello"));
    assert_ne!(fr.header("ETag"), xx.header("ETag"));
}

#[test]
fn test_unknown_locales_share_default_variant() {
    let source = MemorySource::new().with("t.js", "var t = \"{{title|Title}}\";");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline
        .add_inferred("/t.js", ["t.js"])
        .unwrap()
        .localize(Arc::new(StringTable::new().with("fr", "title", "Titre")));
    let mw = localized_middleware(pipeline, &["fr"]);

    for i in 0..200 {
        let res = mw.handle(&AssetRequest::get(format!("/t.js?lang=junk{i}")));
        assert_eq!(res.status, 200);
        assert_eq!(body(&res), "var t = \"Title\";");
    }
    let fr = mw.handle(&AssetRequest::get("/t.js").with_header("Accept-Language", "fr-CH"));
    assert_eq!(body(&fr), "var t = \"Titre\";");

    let asset = mw.pipeline().get("/t.js").unwrap();
    assert_eq!(asset.compile_count(), 2);
    let mut variants = asset.cached_variants();
    variants.sort();
    assert_eq!(variants, vec!["en", "fr"]);
}

#[test]
fn test_localized_and_minified_js_stays_valid() {
    let source = MemorySource::new().with("t.js", "var t = \"{{quote|Quote}}\";");
    let table = StringTable::new().with("fr", "quote", "il a dit \"salut\" `${x}`");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline
        .add_inferred("/t.js", ["t.js"])
        .unwrap()
        .localize(Arc::new(table))
        .minify();
    let mw = localized_middleware(pipeline, &["fr"]);

    let res = mw.handle(&AssetRequest::get("/t.js?lang=fr"));
    assert_eq!(res.status, 200);
    let text = body(&res);
    assert!(text.contains("salut"), "{text}");
    assert!(crate::processor::minify::minify_js(text).is_ok(), "{text}");
}

#[test]
fn test_broken_asset_fails_alone() {
    let source = MemorySource::new()
        .with("ok.css", "a { color: red; }")
        .with("bad.js", "var = ;");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/ok.css", ["ok.css"]).unwrap().minify();
    pipeline.add_inferred("/bad.js", ["bad.js"]).unwrap().minify();
    pipeline.add_inferred("/gone.js", ["gone.js"]).unwrap();
    let mw = middleware(pipeline);

    let bad = mw.handle(&AssetRequest::get("/bad.js"));
    assert_eq!(bad.status, 500);
    assert!(body(&bad).contains("minify-js"));

    let gone = mw.handle(&AssetRequest::get("/gone.js"));
    assert_eq!(gone.status, 500);
    assert!(body(&gone).contains("gone.js"));

    assert_eq!(mw.handle(&AssetRequest::get("/ok.css")).status, 200);

    // Not cached as a failure: the next request tries again.
    mw.handle(&AssetRequest::get("/bad.js"));
    assert_eq!(mw.pipeline().get("/bad.js").unwrap().compile_count(), 2);
}

#[test]
fn test_unknown_route_and_method() {
    let source = MemorySource::new().with("a.css", "a{}");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    let mw = middleware(pipeline);

    assert_eq!(mw.handle(&AssetRequest::get("/missing.css")).status, 404);
    let post = mw.handle(&AssetRequest::new(Method::parse("POST"), "/a.css"));
    assert_eq!(post.status, 405);
    assert_eq!(mw.pipeline().get("/a.css").unwrap().compile_count(), 0);
}

#[test]
fn test_head_has_headers_without_body() {
    let source = MemorySource::new().with("a.css", "a{color:red}");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    let mw = middleware(pipeline);

    let res = mw.handle(&AssetRequest::head("/a.css"));
    assert_eq!(res.status, 200);
    assert!(res.body.is_empty());
    assert_eq!(res.header("Content-Length"), Some("12"));
    assert!(res.header("ETag").is_some());
}

#[test]
fn test_versioned_request_is_immutable() {
    let source = MemorySource::new().with("a.css", "a{color:red}");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    let mw = middleware(pipeline);

    let plain = mw.handle(&AssetRequest::get("/a.css"));
    assert_eq!(plain.header("Cache-Control"), Some("public, no-cache"));

    let url = mw.pipeline().get("/a.css").unwrap().versioned_url(None).unwrap();
    let pinned = mw.handle(&AssetRequest::get(url));
    assert_eq!(
        pinned.header("Cache-Control"),
        Some("public, max-age=31536000, immutable")
    );

    let outdated = mw.handle(&AssetRequest::get("/a.css?v=00000000"));
    assert_eq!(outdated.header("Cache-Control"), Some("public, no-cache"));
}

#[test]
fn test_if_modified_since() {
    let source = MemorySource::new().with("a.css", "a{}");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    let mw = middleware(pipeline);

    let first = mw.handle(&AssetRequest::get("/a.css"));
    let last_modified = first.header("Last-Modified").unwrap().to_string();
    let res = mw.handle(&AssetRequest::get("/a.css").with_header("If-Modified-Since", last_modified));
    assert_eq!(res.status, 304);
}

#[test]
fn test_if_modified_since_after_quick_change() {
    let source = Arc::new(MemorySource::new().with("a.css", "a{color:red}"));
    let mut pipeline = Pipeline::new(Arc::clone(&source) as Arc<dyn crate::source::SourceReader>);
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    let mw = middleware(pipeline);

    let first = mw.handle(&AssetRequest::get("/a.css"));
    let last_modified = first.header("Last-Modified").unwrap().to_string();

    source.set("a.css", "a{color:blue}");
    let res = mw.handle(&AssetRequest::get("/a.css").with_header("If-Modified-Since", last_modified.clone()));
    assert_eq!(res.status, 200);
    assert_eq!(body(&res), "a{color:blue}");
    assert_ne!(res.header("Last-Modified"), Some(last_modified.as_str()));
}

#[test]
fn test_handlers_cover_every_route() {
    let source = MemorySource::new().with("a.css", "a{}").with("b.js", "var b;");
    let mut pipeline = Pipeline::new(Arc::new(source));
    pipeline.add_inferred("/a.css", ["a.css"]).unwrap();
    pipeline.add_inferred("/b.js", ["b.js"]).unwrap();
    let mw = Arc::new(middleware(pipeline));

    let handlers = mw.handlers();
    let routes: Vec<_> = handlers.iter().map(|(route, _)| route.as_str()).collect();
    assert_eq!(routes, vec!["/a.css", "/b.js"]);

    let (route, handler) = &handlers[1];
    let res = handler(&AssetRequest::get(route.clone()));
    assert_eq!(res.status, 200);
    assert_eq!(body(&res), "var b;");
}
