//! Processor chain: ordered text transforms applied to an asset.
//!
//! ```text
//! source[0] ─ pre[0] ─ pre[1] ─┐
//! source[1] ─ pre[0] ─ pre[1] ─┼─ join("\n") ─ post[0] ─ post[1] ─ output
//! source[n] ─ pre[0] ─ pre[1] ─┘
//! ```
//!
//! Steps run strictly in registration order, each consuming the previous
//! step's output. The first failing step stops the chain.

pub mod localize;
pub mod minify;

pub use localize::{Localizer, Lookup, StringTable};
pub use minify::Minifier;

use std::sync::Arc;

use crate::error::ProcessingError;
use crate::freshness::Fingerprinter;

/// Separator placed between source files so tokens never merge across files.
pub const SOURCE_SEPARATOR: &str = "\n";

/// Per-compile information handed to every step.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    pub route: &'a str,
    pub content_type: &'a str,
    /// Requested locale, only set for locale-aware assets.
    pub locale: Option<&'a str>,
}

/// A single text transform.
pub trait Processor: Send + Sync {
    /// Stable identity, reported in `ProcessingError::step`.
    fn name(&self) -> &str;

    /// Serialized settings; part of the source fingerprint.
    fn settings(&self) -> String {
        String::new()
    }

    /// Whether the output depends on `ProcessContext::locale`.
    fn uses_locale(&self) -> bool {
        false
    }

    fn process(&self, input: String, ctx: &ProcessContext<'_>) -> Result<String, ProcessingError>;
}

/// Where in the chain a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Once per source file, before concatenation.
    Pre,
    /// Once on the concatenated text.
    Post,
}

#[derive(Clone, Default)]
pub struct ProcessorChain {
    pre: Vec<Arc<dyn Processor>>,
    post: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Stage, step: Arc<dyn Processor>) {
        match stage {
            Stage::Pre => self.pre.push(step),
            Stage::Post => self.post.push(step),
        }
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn uses_locale(&self) -> bool {
        self.steps().any(|(_, p)| p.uses_locale())
    }

    /// Step names in execution order, prefixed by stage.
    pub fn describe(&self) -> Vec<String> {
        self.steps()
            .map(|(stage, p)| match stage {
                Stage::Pre => format!("pre:{}", p.name()),
                Stage::Post => p.name().to_string(),
            })
            .collect()
    }

    /// Feed every step's identity and settings into a fingerprint.
    pub fn fingerprint_into(&self, fp: &mut Fingerprinter) {
        for (stage, step) in self.steps() {
            let tag = match stage {
                Stage::Pre => "pre",
                Stage::Post => "post",
            };
            fp.field(tag, step.name());
            fp.field("settings", step.settings());
        }
    }

    /// Run the chain over source texts (in source-list order).
    pub fn run(&self, sources: Vec<String>, ctx: &ProcessContext<'_>) -> Result<String, ProcessingError> {
        let mut processed = Vec::with_capacity(sources.len());
        for source in sources {
            processed.push(run_steps(&self.pre, source, ctx)?);
        }
        run_steps(&self.post, processed.join(SOURCE_SEPARATOR), ctx)
    }

    fn steps(&self) -> impl Iterator<Item = (Stage, &Arc<dyn Processor>)> {
        self.pre
            .iter()
            .map(|p| (Stage::Pre, p))
            .chain(self.post.iter().map(|p| (Stage::Post, p)))
    }
}

fn run_steps(
    steps: &[Arc<dyn Processor>],
    input: String,
    ctx: &ProcessContext<'_>,
) -> Result<String, ProcessingError> {
    steps
        .iter()
        .try_fold(input, |text, step| step.process(text, ctx))
}

impl std::fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffix(&'static str);

    impl Processor for Suffix {
        fn name(&self) -> &str {
            self.0
        }

        fn process(&self, input: String, _: &ProcessContext<'_>) -> Result<String, ProcessingError> {
            Ok(format!("{input}{}", self.0))
        }
    }

    struct Fail;

    impl Processor for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn process(&self, _: String, _: &ProcessContext<'_>) -> Result<String, ProcessingError> {
            Err(ProcessingError::failed("fail", "boom"))
        }
    }

    const CTX: ProcessContext<'static> = ProcessContext {
        route: "/test",
        content_type: "text/plain",
        locale: None,
    };

    #[test]
    fn test_post_steps_run_in_registration_order() {
        let mut chain = ProcessorChain::new();
        chain.push(Stage::Post, Arc::new(Suffix("1")));
        chain.push(Stage::Post, Arc::new(Suffix("2")));
        let out = chain.run(vec!["a".into(), "b".into()], &CTX).unwrap();
        assert_eq!(out, "a\nb12");
    }

    #[test]
    fn test_pre_steps_run_per_source() {
        let mut chain = ProcessorChain::new();
        chain.push(Stage::Pre, Arc::new(Suffix(";")));
        chain.push(Stage::Post, Arc::new(Suffix("!")));
        let out = chain.run(vec!["a".into(), "b".into()], &CTX).unwrap();
        assert_eq!(out, "a;\nb;!");
        assert_eq!(chain.describe(), vec!["pre:;", "!"]);
    }

    #[test]
    fn test_failure_short_circuits() {
        let mut chain = ProcessorChain::new();
        chain.push(Stage::Post, Arc::new(Fail));
        chain.push(Stage::Post, Arc::new(Suffix("never")));
        let err = chain.run(vec!["a".into()], &CTX).unwrap_err();
        assert_eq!(err.step, "fail");
    }

    #[test]
    fn test_empty_sources_are_valid() {
        let chain = ProcessorChain::new();
        assert_eq!(chain.run(vec![String::new()], &CTX).unwrap(), "");
    }

    #[test]
    fn test_fingerprint_depends_on_steps() {
        let mut a = ProcessorChain::new();
        a.push(Stage::Post, Arc::new(Suffix("x")));
        let mut b = ProcessorChain::new();
        b.push(Stage::Post, Arc::new(Suffix("y")));

        let (mut fa, mut fb) = (Fingerprinter::new(), Fingerprinter::new());
        a.fingerprint_into(&mut fa);
        b.fingerprint_into(&mut fb);
        assert_ne!(fa.finish(), fb.finish());
    }
}
