//! Offset to line/column conversion for the QDA text format.
//!
//! Every parser in this crate reports navigable locations, so they all
//! share one position index: [`LineIndex`] records the byte offset of each
//! line start and resolves arbitrary offsets back to zero-based
//! [`Position`]s. Resolution is total: out-of-range offsets clamp to the
//! last line, degenerate input resolves to `0:0`.

use std::fmt;
use std::ops::Range as ByteRange;

use serde::{Deserialize, Serialize};

/// A zero-based line:column position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range: the byte span plus its resolved start/end positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// Whether a position falls inside this range (inclusive bounds).
    pub fn contains(&self, pos: Position) -> bool {
        (self.start.line < pos.line
            || (self.start.line == pos.line && self.start.column <= pos.column))
            && (self.end.line > pos.line
                || (self.end.line == pos.line && self.end.column >= pos.column))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Ascending byte offsets of line starts; index 0 is always present.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    /// Resolve a byte offset to the position of the last line start at or
    /// before it. Offsets past the end of the text land on the final line.
    pub fn position_at(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|insert| insert.saturating_sub(1));
        Position::new(line, offset.saturating_sub(self.line_starts[line]))
    }

    /// The line containing a byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        self.position_at(offset).line
    }

    /// Resolve a byte span to a [`Range`].
    pub fn range(&self, span: ByteRange<usize>) -> Range {
        Range::new(
            span.clone(),
            self.position_at(span.start),
            self.position_at(span.end),
        )
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where a line begins, if the line exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_resolves_to_origin() {
        let index = LineIndex::new("");
        assert_eq!(index.position_at(0), Position::new(0, 0));
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn resolves_across_lines() {
        let index = LineIndex::new("SOURCE @a\n    text: hi\nEND SOURCE\n");
        assert_eq!(index.position_at(0), Position::new(0, 0));
        assert_eq!(index.position_at(9), Position::new(0, 9));
        assert_eq!(index.position_at(10), Position::new(1, 0));
        assert_eq!(index.position_at(14), Position::new(1, 4));
        assert_eq!(index.position_at(23), Position::new(2, 0));
    }

    #[test]
    fn clamps_offsets_past_the_end() {
        let index = LineIndex::new("ab\ncd");
        let pos = index.position_at(99);
        assert_eq!(pos.line, 1);
    }

    #[test]
    fn multibyte_characters_keep_byte_columns() {
        let index = LineIndex::new("é\nraça");
        assert_eq!(index.position_at(3), Position::new(1, 0));
        assert_eq!(index.position_at(4), Position::new(1, 1));
    }

    #[test]
    fn line_start_round_trip() {
        let text = "one\ntwo\nthree";
        let index = LineIndex::new(text);
        for line in 0..index.line_count() {
            let start = index.line_start(line).unwrap();
            assert_eq!(index.position_at(start), Position::new(line, 0));
        }
        assert_eq!(index.line_start(3), None);
    }

    #[test]
    fn range_contains_inclusive_bounds() {
        let range = Range::new(0..10, Position::new(1, 2), Position::new(2, 4));
        assert!(range.contains(Position::new(1, 2)));
        assert!(range.contains(Position::new(2, 4)));
        assert!(range.contains(Position::new(1, 9)));
        assert!(!range.contains(Position::new(1, 1)));
        assert!(!range.contains(Position::new(2, 5)));
    }
}
