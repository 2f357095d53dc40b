//! Error formatting with source context and visual highlighting
//!
//! Renders a compile error together with the offending expression line and a
//! `^^^` marker under the span the error points at.

use crate::core::span::Span;
use crate::error::ExpressionError;

/// Format an error message with source context
pub struct ErrorFormatter<'a> {
    source: &'a str,
    span: Option<Span>,
    error_message: String,
}

impl<'a> ErrorFormatter<'a> {
    /// Create a formatter for an error raised while compiling `source`
    pub fn new(source: &'a str, error: &ExpressionError) -> Self {
        Self {
            source,
            span: error.span(),
            error_message: error.to_string(),
        }
    }

    /// Create a formatter from a bare message and span
    pub fn with_span(source: &'a str, span: Span, error_message: impl Into<String>) -> Self {
        Self {
            source,
            span: Some(span),
            error_message: error_message.into(),
        }
    }

    /// Line (1-based) and character column (1-based) of the span start
    fn location(&self, span: Span) -> (usize, usize) {
        let start = (span.start as usize).min(self.source.len());
        let prefix = self.source.get(..start).unwrap_or(self.source);
        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
        let column = prefix[line_start..].chars().count() + 1;
        (line, column)
    }

    /// Format the error message with source context
    pub fn format(&self) -> String {
        let Some(span) = self.span else {
            return format!("Error: {}\n", self.error_message);
        };

        let (line, column) = self.location(span);
        let lines: Vec<&str> = self.source.lines().collect();
        let line_text = lines.get(line - 1).copied().unwrap_or("");
        let line_num_width = line.to_string().len();

        // Highlight at least one column, and never past the end of the line
        let highlighted = self
            .source
            .get(span.start as usize..span.end as usize)
            .map_or(0, |text| text.lines().next().unwrap_or("").chars().count());
        let remaining = line_text.chars().count().saturating_sub(column - 1);
        let length = highlighted.min(remaining).max(1);

        let mut output = String::with_capacity(128 + line_text.len() * 2);
        output.push_str(&format!("Error at line {line}, column {column}:\n"));
        output.push_str(&format!("  {}\n\n", self.error_message));
        output.push_str(&format!(" {line:line_num_width$} | {line_text}\n"));
        output.push_str(&format!(
            "{}{}{}\n",
            " ".repeat(line_num_width + 3),
            " ".repeat(column - 1),
            "^".repeat(length)
        ));
        output
    }
}

/// Format a compile error against the expression it came from
pub fn format_expression_error(source: &str, error: &ExpressionError) -> String {
    ErrorFormatter::new(source, error).format()
}
