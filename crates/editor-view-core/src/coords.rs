//! Coordinate translation between real and display positions.
//!
//! Translation is line-level only: the column passes through unchanged. Wrapping does not
//! affect display coordinates; rows are resolved by the layout cache.

use crate::folding::Folding;
use crate::position::{DisplayPosition, Position};

/// Display position of a real position. Hidden lines map to their fold anchor.
pub fn to_display(folding: &dyn Folding, pos: Position) -> DisplayPosition {
    DisplayPosition::new(folding.line_to_visible_line(pos.line), pos.column)
}

/// Display line of a real line, or `None` if `line` is past the end of the document.
pub fn to_display_line(folding: &dyn Folding, line: usize) -> Option<usize> {
    (line < folding.line_count()).then(|| folding.line_to_visible_line(line))
}

/// Real position shown at a display position.
pub fn to_real(folding: &dyn Folding, pos: DisplayPosition) -> Position {
    Position::new(folding.visible_line_to_line(pos.line), pos.column)
}

/// Real line shown at a display line, or `None` if past the last display line.
pub fn to_real_line(folding: &dyn Folding, line: usize) -> Option<usize> {
    (line < folding.visible_line_count()).then(|| folding.visible_line_to_line(line))
}
