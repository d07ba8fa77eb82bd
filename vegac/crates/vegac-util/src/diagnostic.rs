//! Error and warning reporting infrastructure.
//!
//! Each compiler stage reports problems as [`Diagnostic`] values pushed
//! into a shared [`Handler`]. The handler uses interior mutability so the
//! lexer, parser, analyzer, and emitter can all hold `&Handler` at the same
//! time. The driver prints the collected diagnostics to standard error at
//! the end of the run and derives its exit code from [`Handler::has_errors`].
//!
//! A diagnostic renders as `file:line:column: error: message`; the location
//! is elided when the span is dummy (used for file-level messages such as
//! the missing-`main` warning).

use crate::Span;
use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level.
///
/// # Examples
///
/// ```
/// use vegac_util::Level;
///
/// assert_eq!(format!("{}", Level::Error), "error");
/// assert_eq!(format!("{}", Level::Warning), "warning");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that fails the compilation.
    Error,
    /// A warning; compilation proceeds.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity, file, and location.
///
/// # Examples
///
/// ```
/// use vegac_util::{Diagnostic, Span};
///
/// let diag = Diagnostic::error("main.vega", "unexpected token", Span::new(0, 1, 3, 9));
/// assert_eq!(format!("{}", diag), "main.vega:3:9: error: unexpected token");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Main message text.
    pub message: String,
    /// File the diagnostic refers to.
    pub file: String,
    /// Location within the file.
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(level: Level, file: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            file: file.into(),
            span,
        }
    }

    /// Create an error diagnostic.
    pub fn error(file: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, file, message, span)
    }

    /// Create a warning diagnostic.
    pub fn warning(file: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, file, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_dummy() {
            write!(f, "{}: {}: {}", self.file, self.level, self.message)
        } else {
            write!(
                f,
                "{}:{}:{}: {}: {}",
                self.file, self.span.line, self.span.column, self.level, self.message
            )
        }
    }
}

/// Handler for collecting diagnostics across compiler stages.
///
/// The handler is append-only during a compilation; stages push diagnostics
/// and the driver reads them back once the pipeline has finished (or
/// short-circuited).
///
/// # Examples
///
/// ```
/// use vegac_util::{Diagnostic, Handler, Span};
///
/// let handler = Handler::new();
/// assert!(!handler.has_errors());
///
/// handler.emit(Diagnostic::error("main.vega", "undefined name 'x'", Span::DUMMY));
/// assert!(handler.has_errors());
/// assert_eq!(handler.error_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Record a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Whether any error-level diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Snapshot of all recorded diagnostics, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// The first error-level diagnostic, if any.
    pub fn first_error(&self) -> Option<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .find(|d| d.level == Level::Error)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_diagnostic_display_with_location() {
        let diag = Diagnostic::error("a.vega", "bad token", Span::new(5, 1, 2, 7));
        assert_eq!(format!("{}", diag), "a.vega:2:7: error: bad token");
    }

    #[test]
    fn test_diagnostic_display_dummy_span() {
        let diag = Diagnostic::warning("a.vega", "no 'main' function defined", Span::DUMMY);
        assert_eq!(
            format!("{}", diag),
            "a.vega: warning: no 'main' function defined"
        );
    }

    #[test]
    fn test_handler_counts() {
        let handler = Handler::new();
        handler.emit(Diagnostic::error("a.vega", "e1", Span::DUMMY));
        handler.emit(Diagnostic::warning("a.vega", "w1", Span::DUMMY));

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 1);
        assert_eq!(handler.diagnostics().len(), 2);
    }

    #[test]
    fn test_handler_first_error() {
        let handler = Handler::new();
        handler.emit(Diagnostic::warning("a.vega", "w", Span::DUMMY));
        handler.emit(Diagnostic::error("a.vega", "first", Span::DUMMY));
        handler.emit(Diagnostic::error("a.vega", "second", Span::DUMMY));

        assert_eq!(handler.first_error().unwrap().message, "first");
    }

    #[test]
    fn test_handler_warnings_do_not_fail() {
        let handler = Handler::new();
        handler.emit(Diagnostic::warning("a.vega", "w", Span::DUMMY));
        assert!(!handler.has_errors());
    }
}
