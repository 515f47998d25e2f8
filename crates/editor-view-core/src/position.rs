//! Coordinate value types.
//!
//! Two coordinate spaces are exposed as distinct types so they cannot be mixed up:
//!
//! - [`Position`]: a *real* document coordinate (`line` is a document line index).
//! - [`DisplayPosition`]: a *display* coordinate, where `line` counts only lines that are
//!   not hidden inside a collapsed fold. Without folding both spaces coincide.
//!
//! Columns are counted in Unicode scalar values (`char`s) in both spaces.
//!
//! The third space, *view lines* (rows produced by soft wrapping), is addressed by row
//! indices and [`crate::ViewLine`] references rather than by a position type.

use std::cmp::Ordering;
use std::fmt;

/// A real document position (line index and character column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based document line.
    pub line: usize,
    /// Zero-based column in characters.
    pub column: usize,
}

impl Position {
    /// Create a new real position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of the document.
    pub const fn zero() -> Self {
        Self { line: 0, column: 0 }
    }

    /// Same line, different column.
    pub const fn with_column(self, column: usize) -> Self {
        Self {
            line: self.line,
            column,
        }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A display ("virtual") position: folded lines are skipped in `line` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayPosition {
    /// Zero-based display line.
    pub line: usize,
    /// Zero-based column in characters.
    pub column: usize,
}

impl DisplayPosition {
    /// Create a new display position.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of the document.
    pub const fn zero() -> Self {
        Self { line: 0, column: 0 }
    }

    /// Same display line, different column.
    pub const fn with_column(self, column: usize) -> Self {
        Self {
            line: self.line,
            column,
        }
    }
}

impl Ord for DisplayPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for DisplayPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DisplayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}:{}", self.line, self.column)
    }
}
