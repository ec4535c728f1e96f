//! Diagnostics produced while parsing and evaluating expressions
//!
//! Every failure inside the evaluation scope is reported as a [`Diagnostic`]
//! and collected into [`Diagnostics`] in the order a depth-first walk first
//! produced them.

use std::fmt;

use rhcl_parser::{ParseError, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// What went wrong, independent of the message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Parse,
    UndefinedReference,
    UnknownFunction,
    Arity,
    TypeConversion,
    FunctionExecution,
    ResourceNotFound,
    ResultTypeMismatch,
    InvalidExpression,
    DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// One-line summary
    pub summary: String,
    /// Full explanation
    pub detail: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.into(),
            detail: detail.into(),
            span: None,
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            summary: summary.into(),
            detail: detail.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with a `line:column` position computed from `source`
    pub fn render(&self, source: &str) -> String {
        match self.span {
            Some(span) => {
                let (line, column) = span.line_col(source);
                format!(
                    "{}: {}\n  on line {}, column {}:\n  {}",
                    self.severity, self.summary, line, column, self.detail
                )
            }
            None => format!("{}: {}\n  {}", self.severity, self.summary, self.detail),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}; {}", self.severity, self.summary, self.detail)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        let span = err.span();
        let diag = Diagnostic::error(DiagnosticKind::Parse, "Invalid expression", err.to_string());
        match span {
            Some(span) => diag.with_span(span),
            None => diag,
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    /// Append another batch, keeping its order after ours
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Errors first, then warnings; stable within each severity
    pub fn prioritized(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<&Diagnostic> = self.0.iter().collect();
        sorted.sort_by_key(|d| d.severity);
        sorted
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.0.first()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(DiagnosticKind::DuplicateKey, "Duplicate key", "k"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error(DiagnosticKind::Arity, "Too many", "f"));
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn prioritized_puts_errors_first_and_keeps_order() {
        let diags: Diagnostics = vec![
            Diagnostic::warning(DiagnosticKind::DuplicateKey, "w1", ""),
            Diagnostic::error(DiagnosticKind::Arity, "e1", ""),
            Diagnostic::warning(DiagnosticKind::DuplicateKey, "w2", ""),
            Diagnostic::error(DiagnosticKind::UnknownFunction, "e2", ""),
        ]
        .into_iter()
        .collect();
        let summaries: Vec<&str> = diags
            .prioritized()
            .iter()
            .map(|d| d.summary.as_str())
            .collect();
        assert_eq!(summaries, vec!["e1", "e2", "w1", "w2"]);
        // The underlying order is untouched
        assert_eq!(diags.first().map(|d| d.summary.as_str()), Some("w1"));
    }

    #[test]
    fn extend_appends_in_order() {
        let mut a: Diagnostics = Diagnostic::error(DiagnosticKind::Arity, "a", "").into();
        let b: Diagnostics = Diagnostic::error(DiagnosticKind::Arity, "b", "").into();
        a.extend(b);
        let summaries: Vec<&str> = a.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["a", "b"]);
    }

    #[test]
    fn render_includes_position() {
        let diag = Diagnostic::error(
            DiagnosticKind::UnknownFunction,
            "Call to unknown function",
            "There is no function named \"nope\".",
        )
        .with_span(Span::new(6, 10));
        insta::assert_snapshot!(
            diag.render("[1,\n  nope()]"),
            @r#"
        Error: Call to unknown function
          on line 2, column 3:
          There is no function named "nope".
        "#
        );
    }
}
