//! Diagnostic reporting.
//!
//! Compile and runtime errors both funnel through a [`Reporter`] rather than
//! calling `eprintln!` directly, so embedders can redirect diagnostics (or
//! collect them for tests) instead of inheriting a hardcoded stderr write.
//! This mirrors keeping parser/VM state in an explicit record instead of a
//! hidden singleton: the reporter is passed in, not reached for globally.

use std::fmt;

/// A single rendered diagnostic line, already formatted per the phase that
/// produced it (compile errors as `[line L] Error at X: message`, runtime
/// errors as `Runtime error: message`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Writes every diagnostic to stderr, one per line. The default reporter for
/// [`crate::interpret`].
#[derive(Default)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("{}", diagnostic);
    }
}

/// Collects diagnostics in memory instead of printing them. Used by tests
/// that need to assert on the exact message text.
#[derive(Default)]
pub struct CollectingReporter {
    pub diagnostics: Vec<Diagnostic>,
}

impl Reporter for CollectingReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
