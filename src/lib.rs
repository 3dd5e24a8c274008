//! Assetline: an in-process asset pipeline.
//!
//! Assets are registered on a [`Pipeline`] with their source files and a
//! processor chain (minify, localize, or custom steps). Outputs are compiled
//! on first request, cached per locale, and recompiled only when a source or
//! the chain changes. [`AssetMiddleware`] serves them with ETags and
//! conditional-request support, either behind an external router or through
//! the bundled [`serve`] HTTP server.

pub mod asset;
pub mod config;
pub mod error;
pub mod freshness;
pub mod logger;
pub mod middleware;
pub mod pipeline;
pub mod processor;
pub mod serve;
pub mod source;
pub mod utils;

pub use asset::{Asset, CompiledArtifact};
pub use error::{CompileError, ConfigurationError, ProcessingError, SourceNotFoundError};
pub use middleware::{AssetMiddleware, AssetRequest, AssetResponse, ServeOptions};
pub use pipeline::Pipeline;
pub use processor::{Lookup, Processor};
pub use source::{FsSource, MemorySource, SourceReader};
