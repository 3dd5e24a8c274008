//! Error taxonomy for registration and compilation.
//!
//! - [`ConfigurationError`]: raised while wiring the pipeline; fatal to startup.
//! - [`CompileError`]: raised per compile; turned into a failure response and
//!   retried on the next request.
//!
//! Unresolved localization tokens are not errors (see `processor::localize`).

use std::fmt;
use thiserror::Error;

// ============================================================================
// ConfigurationError
// ============================================================================

/// Errors raised by `Pipeline::add` / `Asset::add_processor`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),

    #[error("asset `{0}` has no source files")]
    EmptySources(String),

    #[error("route `{0}` must start with `/`")]
    InvalidRoute(String),
}

// ============================================================================
// CompileError
// ============================================================================

/// A source identifier could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("source `{id}` not found: {reason}")]
pub struct SourceNotFoundError {
    pub id: String,
    pub reason: String,
}

impl SourceNotFoundError {
    pub fn new(id: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why a processor step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingErrorKind {
    /// Input could not be parsed (minifiers).
    SyntaxError,
    /// Any other transform failure.
    Failed,
}

impl fmt::Display for ProcessingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError => f.write_str("syntax error"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A processor step failed; carries the failing step's identity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("processor `{step}` {kind}: {message}")]
pub struct ProcessingError {
    pub step: String,
    pub kind: ProcessingErrorKind,
    pub message: String,
}

impl ProcessingError {
    pub fn syntax(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            kind: ProcessingErrorKind::SyntaxError,
            message: message.into(),
        }
    }

    pub fn failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            kind: ProcessingErrorKind::Failed,
            message: message.into(),
        }
    }
}

/// Failure of a single compile.
///
/// `Clone` because one coalesced compile result is delivered to every waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    SourceNotFound(#[from] SourceNotFoundError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    // The leader of a coalesced compile went away without reporting.
    #[error("compile for `{0}` was abandoned")]
    Abandoned(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::DuplicateRoute("/app.js".into());
        assert!(err.to_string().contains("/app.js"));
        assert!(err.to_string().contains("already registered"));

        let err = ConfigurationError::EmptySources("/app.css".into());
        assert!(err.to_string().contains("no source files"));
    }

    #[test]
    fn test_processing_error_names_step() {
        let err: CompileError = ProcessingError::syntax("minify-js", "unexpected token").into();
        let display = err.to_string();
        assert!(display.contains("minify-js"));
        assert!(display.contains("syntax error"));
        assert!(display.contains("unexpected token"));
    }

    #[test]
    fn test_source_not_found_names_file() {
        let err: CompileError = SourceNotFoundError::new("js/missing.js", "no such file").into();
        assert!(err.to_string().contains("js/missing.js"));
        assert!(matches!(err, CompileError::SourceNotFound(ref e) if e.id == "js/missing.js"));
    }
}
