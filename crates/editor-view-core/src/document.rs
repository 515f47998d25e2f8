//! Document collaborator.
//!
//! The view core never owns text. It reads lines through the [`Document`] trait and learns
//! about edits through [`TextChange`] notifications. [`TextDocument`] is a small rope-backed
//! implementation used by tests, benchmarks and hosts that do not have their own buffer.
//!
//! # Example
//!
//! ```rust
//! use editor_view_core::{Document, Position, TextDocument};
//!
//! let mut doc = TextDocument::from_text("hello\nworld");
//! let change = doc.insert(Position::new(0, 5), ",\nbig").unwrap();
//!
//! assert_eq!(doc.line_count(), 3);
//! assert_eq!(doc.line_text(1).as_deref(), Some("big"));
//! assert_eq!(change.line_delta(), 1);
//! ```

use std::ops::Range;

use ropey::{Rope, RopeSlice};

use crate::error::DocumentError;
use crate::position::Position;
use crate::subscription::{SubscriptionId, Subscribers};

/// Read access to document lines.
///
/// Line lengths and columns are counted in `char`s and exclude the line terminator.
pub trait Document {
    /// Number of lines (always at least 1; an empty document has one empty line).
    fn line_count(&self) -> usize;

    /// Length of `line` in characters, or 0 when `line` is out of range.
    fn line_length(&self, line: usize) -> usize;

    /// Text of `line` without its terminator, or `None` when out of range.
    fn line_text(&self, line: usize) -> Option<String>;

    /// Position just past the last character of the document.
    fn end_position(&self) -> Position {
        let last = self.line_count().saturating_sub(1);
        Position::new(last, self.line_length(last))
    }

    /// Clamp `pos` into the document.
    fn clamp_position(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        Position::new(line, pos.column.min(self.line_length(line)))
    }
}

/// A single edit, described by its real-coordinate extents before and after the edit.
///
/// - insertion: `old_end == start`, `new_end` is the end of the inserted text.
/// - removal: `new_end == start`, `old_end` is the end of the removed text.
/// - replacement: both differ from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChange {
    /// Where the edit starts (same before and after).
    pub start: Position,
    /// End of the replaced range in pre-edit coordinates.
    pub old_end: Position,
    /// End of the inserted text in post-edit coordinates.
    pub new_end: Position,
}

impl TextChange {
    /// An insertion of text spanning `start..new_end`.
    pub fn inserted(start: Position, new_end: Position) -> Self {
        Self {
            start,
            old_end: start,
            new_end,
        }
    }

    /// A removal of `start..old_end`.
    pub fn removed(start: Position, old_end: Position) -> Self {
        Self {
            start,
            old_end,
            new_end: start,
        }
    }

    /// Net change in document line count.
    pub fn line_delta(&self) -> isize {
        self.new_end.line as isize - self.old_end.line as isize
    }

    /// `true` if the edit only touches a single line and does not add or remove lines.
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.old_end.line && self.start.line == self.new_end.line
    }

    /// Post-edit lines whose content changed.
    pub fn changed_lines(&self) -> Range<usize> {
        self.start.line..self.new_end.line.saturating_add(1)
    }

    /// Map a pre-edit position to its post-edit location.
    ///
    /// Positions before the edit are unchanged, positions inside a removed range collapse to
    /// `start`, positions after the edit move with the text.
    pub fn map_position(&self, pos: Position) -> Position {
        if pos < self.start {
            return pos;
        }
        // Inserting exactly at a position pushes it along, like typing at a caret.
        if self.old_end == self.start {
            return shift_after(pos, self.old_end, self.new_end);
        }
        if pos < self.old_end {
            return self.start;
        }
        shift_after(pos, self.old_end, self.new_end)
    }
}

fn shift_after(pos: Position, old_end: Position, new_end: Position) -> Position {
    if pos.line == old_end.line {
        Position::new(
            new_end.line,
            new_end.column + pos.column.saturating_sub(old_end.column),
        )
    } else {
        let line = (pos.line as isize + new_end.line as isize - old_end.line as isize).max(0);
        Position::new(line as usize, pos.column)
    }
}

/// Rope-backed editable document.
pub struct TextDocument {
    rope: Rope,
    version: u64,
    subscribers: Subscribers<TextChange>,
}

impl TextDocument {
    /// Create an empty document (one empty line).
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Build a document from text. `\n`, `\r\n` and the other Unicode line breaks split lines.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            version: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Monotonic edit counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total characters, including line terminators.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Register a callback invoked after every edit.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&TextChange) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Detach a callback registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<TextChange, DocumentError> {
        let offset = self.char_offset(pos)?;
        self.rope.insert(offset, text);
        let new_end = self.position_of_offset(offset + text.chars().count());
        Ok(self.finish_edit(TextChange::inserted(pos, new_end)))
    }

    /// Remove `range` (start inclusive, end exclusive).
    pub fn remove(&mut self, range: Range<Position>) -> Result<TextChange, DocumentError> {
        let (start, end) = self.char_range(&range)?;
        self.rope.remove(start..end);
        Ok(self.finish_edit(TextChange::removed(range.start, range.end)))
    }

    /// Replace `range` with `text` as a single change.
    pub fn replace(
        &mut self,
        range: Range<Position>,
        text: &str,
    ) -> Result<TextChange, DocumentError> {
        let (start, end) = self.char_range(&range)?;
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        let new_end = self.position_of_offset(start + text.chars().count());
        Ok(self.finish_edit(TextChange {
            start: range.start,
            old_end: range.end,
            new_end,
        }))
    }

    /// Break the line at `pos`.
    pub fn split_line(&mut self, pos: Position) -> Result<TextChange, DocumentError> {
        self.insert(pos, "\n")
    }

    /// Join `line` with the following line.
    pub fn join_lines(&mut self, line: usize) -> Result<TextChange, DocumentError> {
        if line.saturating_add(1) >= self.line_count() {
            return Err(DocumentError::InvalidPosition {
                line: line.saturating_add(1),
                column: 0,
            });
        }
        let start = Position::new(line, self.line_length(line));
        self.remove(start..Position::new(line + 1, 0))
    }

    fn finish_edit(&mut self, change: TextChange) -> TextChange {
        self.version = self.version.saturating_add(1);
        tracing::trace!(
            start = %change.start,
            old_end = %change.old_end,
            new_end = %change.new_end,
            "document edit"
        );
        self.subscribers.notify(&change);
        change
    }

    fn char_offset(&self, pos: Position) -> Result<usize, DocumentError> {
        if pos.line >= self.line_count() || pos.column > self.line_length(pos.line) {
            return Err(DocumentError::InvalidPosition {
                line: pos.line,
                column: pos.column,
            });
        }
        Ok(self.rope.line_to_char(pos.line) + pos.column)
    }

    fn char_range(&self, range: &Range<Position>) -> Result<(usize, usize), DocumentError> {
        let invalid = || DocumentError::InvalidRange {
            start_line: range.start.line,
            start_column: range.start.column,
            end_line: range.end.line,
            end_column: range.end.column,
        };
        if range.start > range.end {
            return Err(invalid());
        }
        let start = self.char_offset(range.start).map_err(|_| invalid())?;
        let end = self.char_offset(range.end).map_err(|_| invalid())?;
        Ok((start, end))
    }

    fn position_of_offset(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        Position::new(line, offset - self.rope.line_to_char(line))
    }
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_length(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        slice.len_chars() - line_break_len(slice)
    }

    fn line_text(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars() - line_break_len(slice);
        Some(slice.slice(..len).to_string())
    }
}

/// Number of trailing chars of `slice` that form its line terminator.
fn line_break_len(slice: RopeSlice<'_>) -> usize {
    let len = slice.len_chars();
    if len == 0 {
        return 0;
    }
    match slice.char(len - 1) {
        '\n' => {
            if len >= 2 && slice.char(len - 2) == '\r' {
                2
            } else {
                1
            }
        }
        '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}' => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_line_access_strips_terminators() {
        let doc = TextDocument::from_text("a\r\nbc\nd");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_text(0).as_deref(), Some("a"));
        assert_eq!(doc.line_length(1), 2);
        assert_eq!(doc.line_text(3), None);
        assert_eq!(doc.line_length(3), 0);
    }

    #[test]
    fn test_trailing_newline_creates_empty_last_line() {
        let doc = TextDocument::from_text("abc\n");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.end_position(), Position::new(1, 0));
    }

    #[test]
    fn test_insert_and_remove_report_changes() {
        let mut doc = TextDocument::from_text("hello world");
        let change = doc.insert(Position::new(0, 5), "\n\n").unwrap();
        assert_eq!(change.new_end, Position::new(2, 0));
        assert_eq!(change.line_delta(), 2);

        let change = doc
            .remove(Position::new(0, 5)..Position::new(2, 0))
            .unwrap();
        assert_eq!(change.line_delta(), -2);
        assert_eq!(doc.text(), "hello world");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_invalid_edits_are_rejected() {
        let mut doc = TextDocument::from_text("abc");
        assert_eq!(
            doc.insert(Position::new(0, 4), "x"),
            Err(DocumentError::InvalidPosition { line: 0, column: 4 })
        );
        assert!(doc.remove(Position::new(0, 2)..Position::new(0, 1)).is_err());
        assert!(doc.join_lines(0).is_err());
    }

    #[test]
    fn test_subscribers_see_every_edit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut doc = TextDocument::from_text("ab\ncd");
        let id = {
            let seen = Rc::clone(&seen);
            doc.subscribe(move |c| seen.borrow_mut().push(*c))
        };

        doc.join_lines(0).unwrap();
        doc.unsubscribe(id);
        doc.split_line(Position::new(0, 1)).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], TextChange::removed(Position::new(0, 2), Position::new(1, 0)));
    }

    #[test]
    fn test_map_position_follows_edits() {
        let ins = TextChange::inserted(Position::new(1, 2), Position::new(2, 3));
        assert_eq!(ins.map_position(Position::new(0, 9)), Position::new(0, 9));
        assert_eq!(ins.map_position(Position::new(1, 2)), Position::new(2, 3));
        assert_eq!(ins.map_position(Position::new(1, 5)), Position::new(2, 6));
        assert_eq!(ins.map_position(Position::new(4, 1)), Position::new(5, 1));

        let rem = TextChange::removed(Position::new(1, 2), Position::new(3, 1));
        assert_eq!(rem.map_position(Position::new(2, 0)), Position::new(1, 2));
        assert_eq!(rem.map_position(Position::new(3, 4)), Position::new(1, 5));
        assert_eq!(rem.map_position(Position::new(5, 0)), Position::new(3, 0));
    }
}
