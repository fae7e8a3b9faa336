//! Coordinate types used to reference specific locations within the input
use std::fmt::{Display, Formatter};

/// A [Coords] pinpoints a single character within the input
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Coords {
    /// The absolute character offset within the input
    pub absolute: usize,
    /// The line number, counted from 1
    pub line: usize,
    /// The column number within the current line
    pub column: usize,
}

impl Coords {
    /// Advance the coordinates over a single character.  Newlines reset the column count and
    /// bump the line count, everything else just moves the column along
    pub(crate) fn advance(&mut self, c: char) {
        self.absolute += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Coords {
    /// Default coordinates sit just before the first character of the first line
    fn default() -> Self {
        Coords {
            absolute: 0,
            line: 1,
            column: 0,
        }
    }
}

impl Display for Coords {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[abs: {}, line: {}, column: {}]",
            self.absolute, self.line, self.column
        )
    }
}

/// A [Span] is the linear interval covered by a single token
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start [Coords] for the span
    pub start: Coords,
    /// End [Coords] for the span
    pub end: Coords,
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {}, end: {}", self.start, self.end)
    }
}
