use std::cell::RefCell;

use colored::Colorize;

/// Severity of a reported, non-fatal compilation issue. The compiler never
/// produces `Error` itself — anything serious enough to abort goes through
/// `CompileError` instead — but the variant exists so a host embedding this
/// crate can raise its own severities through the same sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line: i32,
    pub col: i32,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning<S: Into<String>>(line: i32, col: i32, message: S) -> Self {
        Diagnostic { line, col, severity: Severity::Warning, message: message.into() }
    }
}

/// Write-only sink for soft, recoverable problems encountered while
/// compiling (unknown commands, bad notes, swallowed groups, ...).
pub trait Diagnostics {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: prints to stderr the way the rest of this codebase's
/// converters report warnings, colored and line-tagged.
#[derive(Debug, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        let tag = match diagnostic.severity {
            Severity::Warning => "Warning: ".yellow(),
            Severity::Error => "Error: ".red(),
        };
        eprintln!("{}{} (line {}, col {})", tag, diagnostic.message, diagnostic.line, diagnostic.col);
    }
}

/// Collects diagnostics instead of printing them, for tests that want to
/// assert on which soft errors fired.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    collected: RefCell<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.collected.borrow_mut().drain(..).collect()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.collected.borrow_mut().push(diagnostic);
    }
}
