//! Parse error with location and expectation info.

use std::fmt;

use crate::base::Span;

/// A syntax error raised at the first violation, with a pointer to the
/// offending position in the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,
    /// Source location in the query text
    pub span: Span,
    /// What the parser expected to see, if known
    pub expected: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.span.start)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected {expected})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// Create a new parse error with minimal information
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
        }
    }

    /// Attach an expected-token description
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Render the error with a caret pointer into `query`.
    pub fn render(&self, query: &str) -> String {
        let offset = (self.span.start as usize).min(query.len());
        // find the line holding the offset; queries are usually one line
        let line_start = query[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let line_end = query[offset..]
            .find('\n')
            .map(|p| offset + p)
            .unwrap_or(query.len());
        let caret = " ".repeat(offset - line_start);
        let mut out = format!(
            "{}\n    {}\n    {}^",
            self.message,
            &query[line_start..line_end],
            caret
        );
        if let Some(expected) = &self.expected {
            out.push_str(&format!("\n    expected {expected}"));
        }
        out
    }
}
