//! JS and CSS minification.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Both are deterministic:
//! the same input always yields byte-identical output.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, CompressOptionsUnused, Minifier as OxcMinifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::{ProcessContext, Processor};
use crate::error::ProcessingError;
use crate::utils::mime;

/// Built-in minifier step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Minifier {
    Js,
    Css,
}

impl Minifier {
    /// Pick a minifier from a content type, if one applies.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        if mime::is_javascript(content_type) {
            Some(Self::Js)
        } else if mime::is_css(content_type) {
            Some(Self::Css)
        } else {
            None
        }
    }

    pub fn minify(self, source: &str) -> Result<String, ProcessingError> {
        match self {
            Self::Js => minify_js(source),
            Self::Css => minify_css(source),
        }
    }
}

impl Processor for Minifier {
    fn name(&self) -> &str {
        match self {
            Self::Js => "minify-js",
            Self::Css => "minify-css",
        }
    }

    fn settings(&self) -> String {
        // Bump when the option sets below change.
        "v2".to_string()
    }

    fn process(&self, input: String, _: &ProcessContext<'_>) -> Result<String, ProcessingError> {
        self.minify(&input)
    }
}

/// Minify JavaScript source code.
///
/// Parsed as a classic script: top-level declarations are globals shared
/// across concatenated files, so they are neither dropped nor renamed.
pub fn minify_js(source: &str) -> Result<String, ProcessingError> {
    let allocator = Allocator::default();
    let source_type = SourceType::script();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(ProcessingError::syntax("minify-js", error.to_string()));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions {
            unused: CompressOptionsUnused::Keep,
            ..CompressOptions::smallest()
        }),
    };
    let ret = OxcMinifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String, ProcessingError> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| ProcessingError::syntax("minify-css", e.to_string()))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| ProcessingError::failed("minify-css", e.to_string()))?;
    Ok(result.code)
}
