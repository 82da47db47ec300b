//! Line/column tracking for input documents.
//!
//! A `Position` is an immutable value: advancing over text produces a new
//! position rather than mutating the old one. Positions are totally ordered
//! (line first, then column), which lets diagnostics pick the furthest point
//! an attempted parse reached.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// A zero-based line/column coordinate in an input document.
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

    /// The position of the first character of a document.
    pub fn start() -> Self {
        Self::default()
    }

    /// The position after scanning one character: a newline moves to the
    /// start of the next line, anything else advances the column.
    pub fn advance(self, ch: char) -> Self {
        if ch == '\n' {
            Self { line: self.line + 1, column: 0 }
        } else {
            Self { line: self.line, column: self.column + 1 }
        }
    }

    /// Recover the byte offset of this position within `text`.
    ///
    /// Used to anchor diagnostic spans; positions past the end of `text`
    /// clamp to its length.
    pub fn offset_in(&self, text: &str) -> usize {
        let mut pos = Self::start();
        for (offset, ch) in text.char_indices() {
            if pos == *self {
                return offset;
            }
            pos = pos.advance(ch);
        }
        text.len()
    }
}

impl Add<char> for Position {
    type Output = Position;

    fn add(self, ch: char) -> Position {
        self.advance(ch)
    }
}

impl Add<&str> for Position {
    type Output = Position;

    fn add(self, text: &str) -> Position {
        text.chars().fold(self, Position::advance)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Anything that knows where it sits in the input document.
///
/// The engine uses this to attach positions to failures without caring
/// whether it is consuming characters or tokens.
pub trait Located {
    fn position(&self) -> Position;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_over_text() {
        assert_eq!(Position::start() + "ab\ncd", Position::new(1, 2));
        assert_eq!(Position::start() + "", Position::start());
        assert_eq!(Position::start() + "\n\n", Position::new(2, 0));
    }

    #[test]
    fn ordering_is_line_major() {
        assert!(Position::new(0, 9) < Position::new(1, 0));
        assert!(Position::new(1, 1) < Position::new(1, 2));
    }

    #[test]
    fn offset_recovery() {
        let text = "ab\ncd";
        assert_eq!(Position::new(0, 0).offset_in(text), 0);
        assert_eq!(Position::new(1, 0).offset_in(text), 3);
        assert_eq!(Position::new(1, 1).offset_in(text), 4);
        assert_eq!(Position::new(9, 9).offset_in(text), text.len());
    }
}
