//! Request serving for registered assets.
//!
//! Each request walks a small state machine:
//!
//! ```text
//! Received → Resolving ─┬─ NotFound ─────────────────────────┐
//!                       └─ Resolved → Compiling → Responding ┴→ Done
//! ```
//!
//! `Compiling` may run the processor chain; concurrent requests for the same
//! stale asset share one compile (see `asset::CompileCache`). Compile
//! failures become a 500 for this route only and are retried on the next
//! request.

mod request;
mod response;
#[cfg(test)]
mod tests;

pub use request::{AssetRequest, LocaleOptions, Method, RequestContext, Validators};
pub use response::AssetResponse;

use std::sync::Arc;

use crate::asset::{CompileResult, CompiledArtifact, version};
use crate::pipeline::Pipeline;
use crate::{debug, log};

/// Request handler handed to an external router.
pub type Handler = Arc<dyn Fn(&AssetRequest) -> AssetResponse + Send + Sync>;

/// Serving options.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub locale: LocaleOptions,
    /// `max-age` for requests pinned to the current version.
    pub max_age: u64,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            locale: LocaleOptions::default(),
            max_age: 31_536_000,
        }
    }
}

enum State<'a> {
    Received,
    Resolving(&'a str),
    Resolved(RequestContext<'a>),
    NotFound,
    Compiling(RequestContext<'a>),
    Responding(RequestContext<'a>, CompileResult),
    Done(AssetResponse),
}

pub struct AssetMiddleware {
    pipeline: Arc<Pipeline>,
    options: ServeOptions,
}

impl AssetMiddleware {
    pub fn new(pipeline: Arc<Pipeline>, options: ServeOptions) -> Self {
        Self { pipeline, options }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// `(route, handler)` pairs for an external router.
    pub fn handlers(self: &Arc<Self>) -> Vec<(String, Handler)> {
        self.pipeline
            .assets()
            .iter()
            .map(|asset| {
                let middleware = Arc::clone(self);
                let handler: Handler =
                    Arc::new(move |request: &AssetRequest| middleware.handle(request));
                (asset.route().to_string(), handler)
            })
            .collect()
    }

    /// Serve one request. Never panics on compile failure.
    pub fn handle(&self, request: &AssetRequest) -> AssetResponse {
        let mut state = State::Received;
        loop {
            state = match state {
                State::Received => match request.method() {
                    Method::Get | Method::Head => State::Resolving(request.path()),
                    Method::Other(_) => State::Done(AssetResponse::method_not_allowed()),
                },
                State::Resolving(route) => match self.pipeline.get(route) {
                    Some(asset) => State::Resolved(RequestContext {
                        asset,
                        locale: asset
                            .is_localized()
                            .then(|| self.options.locale.resolve(request)),
                        validators: Validators::from_request(request),
                        version: request.query_param(version::VERSION_PARAM),
                        head: *request.method() == Method::Head,
                    }),
                    None => State::NotFound,
                },
                State::NotFound => {
                    debug!("serve"; "404 {}", request.path());
                    State::Done(AssetResponse::not_found())
                }
                State::Resolved(ctx) => State::Compiling(ctx),
                State::Compiling(ctx) => {
                    let result = ctx.asset.output(ctx.locale.as_deref());
                    State::Responding(ctx, result)
                }
                State::Responding(ctx, result) => State::Done(self.respond(&ctx, result)),
                State::Done(response) => return response,
            };
        }
    }

    fn respond(&self, ctx: &RequestContext<'_>, result: CompileResult) -> AssetResponse {
        let artifact = match result {
            Ok(artifact) => artifact,
            Err(e) => {
                log!("error"; "{}: {}", ctx.asset.route(), e);
                let response = AssetResponse::text(500, format!("500 Internal Server Error\n\n{e}"));
                return if ctx.head { response.without_body() } else { response };
            }
        };

        if ctx.validators.matches(&artifact) {
            return self.with_cache_headers(AssetResponse::new(304), ctx, &artifact);
        }

        let response = self
            .with_cache_headers(AssetResponse::new(200), ctx, &artifact)
            .with_header("Content-Type", ctx.asset.content_type());
        if ctx.head {
            response.with_header("Content-Length", artifact.len().to_string())
        } else {
            response.with_body(Arc::clone(artifact.output()))
        }
    }

    fn with_cache_headers(
        &self,
        response: AssetResponse,
        ctx: &RequestContext<'_>,
        artifact: &CompiledArtifact,
    ) -> AssetResponse {
        let cache_control = if version::is_current(ctx.version.as_deref(), &artifact.version()) {
            format!("public, max-age={}, immutable", self.options.max_age)
        } else {
            "public, no-cache".to_string()
        };
        let response = response
            .with_header("ETag", artifact.etag())
            .with_header("Last-Modified", artifact.last_modified())
            .with_header("Cache-Control", cache_control);
        if ctx.locale.is_some() {
            response.with_header("Vary", "Accept-Language")
        } else {
            response
        }
    }
}
