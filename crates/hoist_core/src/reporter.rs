//! Progress reporting for the publish pipeline.
//!
//! The pipeline never prints; the binary decides how stages look on a console.

pub trait Reporter: Send + Sync {
    /// A new stage of the run, e.g. "Generating manifest".
    fn section(&self, title: &str);

    /// Processing of a single asset has started.
    fn asset(&self, filename: &str);

    /// A labelled fact about the current asset ("platform", "sha256", ...).
    fn detail(&self, label: &str, value: &str);

    fn success(&self, msg: &str);

    fn warning(&self, msg: &str);

    fn error(&self, msg: &str);
}

/// A no-op reporter for silent runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn asset(&self, _: &str) {}
    fn detail(&self, _: &str, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
