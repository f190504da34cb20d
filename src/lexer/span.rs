use std::fmt;

/// Location of a token or diagnostic in the source text.
///
/// `start`/`end` are byte offsets; `line` and `column` are 1-based and
/// refer to the start of the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span pointing at nothing, for synthesized nodes.
    pub fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Extend this span to cover `other` as well.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line.max(1)),
            column: self.column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
