//! Source locations carried by AST nodes and diagnostics.

use std::fmt;

/// Where a syntax node starts in the script text.
///
/// Spans are produced by whatever front end built the AST; the compiler only
/// copies them into errors and, when debug info is requested, into bytecode
/// line tables.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether the span carries no location (synthesized nodes).
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// Smallest span starting at `self` that also covers `other`.
    ///
    /// Spans on different lines keep the start of `self`.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line != other.line {
            return Span {
                line: self.line,
                col: self.col,
                len: self.len + other.len,
            };
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span {
            line: self.line,
            col: start,
            len: end - start,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
