//! Diagnostics produced by the compiler stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open range of character offsets into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Which stage reported a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Syntax,
    Semantic,
    Interpretation,
    Warning,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "Syntax error",
            DiagnosticKind::Semantic => "Semantic error",
            DiagnosticKind::Interpretation => "Interpretation error",
            DiagnosticKind::Warning => "Warning",
        }
    }
}

/// An error or warning with an optional source location.
///
/// `span` is `None` when there is no specific location, e.g. an unexpected
/// end of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn syntax(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            message: message.into(),
            span,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Semantic,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn interpretation(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind: DiagnosticKind::Interpretation,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            span,
        }
    }

    /// 1-based `(line, column)` of the span start, if the diagnostic has one.
    pub fn line_col(&self, source: &str) -> Option<(usize, usize)> {
        self.span.map(|span| line_col(source, span.start))
    }

    /// Render the diagnostic against the source it was produced from.
    pub fn render(&self, source: &str) -> String {
        match self.line_col(source) {
            Some((line, col)) => format!(
                "{} at line {line}, col {col}: {}",
                self.kind.label(),
                self.message
            ),
            None => format!("{} at end of input: {}", self.kind.label(), self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "[{}..{}] {}: {}",
                span.start,
                span.end,
                self.kind.label(),
                self.message
            ),
            None => write!(f, "[eof] {}: {}", self.kind.label(), self.message),
        }
    }
}

/// Convert a character offset into a 1-based line and column.
///
/// Offsets past the end of the text clamp to the position just after the
/// last character.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for ch in source.chars().take(offset) {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
