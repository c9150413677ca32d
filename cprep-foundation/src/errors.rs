//! Types for error reporting.
//!
//! Diagnostics here are deliberately lighter than a full compiler's: the core
//! preprocessing engine only promises a zero-argument error callback (see
//! [`PreprocessorError`]), but embedders that want more than a bare
//! notification can collect the richer [`Diagnostic`] values through a
//! [`DiagnosticSink`] instead.

mod sink;

pub use sink::*;
use thiserror::Error;

/// The categories of recoverable error the engine can report, matching the
/// error kinds the preprocessing core is specified to surface. None of these
/// are fatal: the engine reports one, then keeps going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreprocessorError {
    #[error("{line}: ill-formed token '{lexeme}'")]
    LexError { line: u32, lexeme: String },

    #[error("{line}: malformed `#{directive}` directive: {reason}")]
    DirectiveSyntax {
        line: u32,
        directive: String,
        reason: String,
    },

    #[error("{line}: {reason}")]
    ConditionalImbalance { line: u32, reason: String },

    #[error("{line}: could not resolve #include {path:?} ({kind})")]
    IncludeUnresolved {
        line: u32,
        path: String,
        kind: IncludeKind,
    },

    #[error("{line}: macro `{name}` invoked with {got} argument(s), expected {expected}")]
    MacroArity {
        line: u32,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("{line}: macro expansion exceeded the recursion depth limit ({limit})")]
    ExpansionOverflow { line: u32, limit: usize },
}

impl PreprocessorError {
    /// The physical source line the error was detected at.
    pub fn line(&self) -> u32 {
        match self {
            PreprocessorError::LexError { line, .. }
            | PreprocessorError::DirectiveSyntax { line, .. }
            | PreprocessorError::ConditionalImbalance { line, .. }
            | PreprocessorError::IncludeUnresolved { line, .. }
            | PreprocessorError::MacroArity { line, .. }
            | PreprocessorError::ExpansionOverflow { line, .. } => *line,
        }
    }
}

/// Whether an `#include` used angle brackets (system) or quotes (local).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    System,
    Local,
}

impl std::fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IncludeKind::System => "system",
            IncludeKind::Local => "local",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LabelStyle {
    /// Labels that describe the primary cause of a diagnostic.
    Primary,
    /// Labels that provide additional context for a diagnostic.
    Secondary,
}

/// Labels allow you to attach information about where in the code an error occurred.
#[derive(Debug, Clone)]
pub struct Label {
    pub style: LabelStyle,
    pub line: u32,
    pub message: String,
}

impl Label {
    pub fn new(style: LabelStyle, line: u32, message: impl Into<String>) -> Self {
        Self {
            style,
            line,
            message: message.into(),
        }
    }

    pub fn primary(line: u32, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Primary, line, message)
    }

    pub fn secondary(line: u32, message: impl Into<String>) -> Self {
        Self::new(LabelStyle::Secondary, line, message)
    }
}

/// Diagnostic severity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Bug,
}

/// Diagnostic describing a problem encountered while preprocessing.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            labels: vec![],
            notes: vec![],
        }
    }

    /// Creates a new bug-level diagnostic from anything displayable.
    pub fn bug(error: impl ToString) -> Self {
        Self::new(Severity::Bug, error.to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl From<&PreprocessorError> for Diagnostic {
    fn from(error: &PreprocessorError) -> Self {
        Diagnostic::error(error.to_string()).with_label(Label::primary(error.line(), ""))
    }
}
