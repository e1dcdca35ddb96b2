//! Source positions attached to tokens, AST nodes and diagnostics.

use std::fmt;

/// Where a piece of source text starts, and how long it is.
///
/// Lines and columns are 1-based; columns count bytes. A zero span
/// (`Span::default()`) marks compiler-synthesized code that has no source.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
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

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this span points at real source text.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Extend `self` so that it also covers `other`.
    ///
    /// Spans on different lines keep the start of `self` and sum the lengths,
    /// which is enough for diagnostics that only print the start position.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        if self.line == other.line {
            let start = self.col.min(other.col);
            let end = (self.col + self.len).max(other.col + other.len);
            Span::new(self.line, start, end - start)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
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
