//! Source span tracking for error reporting

use serde::Serialize;

/// A byte range in the expression source
///
/// Uses u32 for positions; condition expressions are short, single-line rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    /// Start byte offset in the source
    pub start: u32,
    /// End byte offset in the source (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Zero-width span at a position, used for end-of-input diagnostics
    pub fn point(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Get the length of this span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    /// Check if this span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Merge two spans into a single span covering both
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Extract the text for this span from the source
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }

    /// Character column (1-based) of the span start within `source`
    pub fn column(&self, source: &str) -> usize {
        let start = (self.start as usize).min(source.len());
        source
            .get(..start)
            .map_or(start, |prefix| prefix.chars().count())
            + 1
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
