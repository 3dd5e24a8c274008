//! `serve` command.

use std::sync::Arc;

use anyhow::Result;

use assetline::config::AssetlineConfig;
use assetline::middleware::AssetMiddleware;
use assetline::pipeline::Pipeline;
use assetline::serve::bind_server;
use assetline::{debug, log};

pub fn serve(config: &AssetlineConfig, warm: bool) -> Result<()> {
    let pipeline = config.build_pipeline()?.freeze();
    log!("serve"; "{} routes from {}", pipeline.len(), config.source_root().display());

    // Bind first so a port conflict fails before the warm-up work.
    let server = bind_server(config.serve.interface, config.serve.port)?;

    if warm {
        warm_up(&pipeline, &config.locales());
    }

    let middleware = Arc::new(AssetMiddleware::new(pipeline, config.serve_options()));
    server.run(middleware, config.serve.workers)
}

fn warm_up(pipeline: &Pipeline, locales: &[String]) {
    let reports = pipeline.warm_with(locales, |report| match &report.result {
        Ok(artifact) => debug!("compile"; "{} {}", report.route, artifact.etag()),
        Err(e) => log!("error"; "{}: {}", report.route, e),
    });
    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    log!("serve"; "warmed {} variants, {} failed", reports.len() - failed, failed);
}
