//! Selections and the drag-selection state machine.
//!
//! A [`Selection`] remembers its anchor as given, so a drag can shrink back past it. The
//! interactive drag is a small state machine, `Idle -> Dragging(mode) -> Idle`, where the mode
//! is fixed by the click that started it:
//!
//! - [`SelectionMode::Character`]: `[anchor, cursor]`.
//! - [`SelectionMode::Word`]: the moving end snaps to word boundaries; the word under the
//!   initial click always stays selected.
//! - [`SelectionMode::Line`]: both ends snap to whole lines; the line under the initial click
//!   always stays selected.

use std::ops::Range;

use crate::document::Document;
use crate::position::Position;

/// A selection between an anchor and an active end (the caret).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Selection {
    /// Fixed end.
    pub anchor: Position,
    /// Moving end; the caret position.
    pub active: Position,
}

impl Selection {
    /// Selection from `anchor` to `active`.
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    /// Empty selection at `pos`.
    pub fn caret(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    /// Forward selection over `range`.
    pub fn from_range(range: Range<Position>) -> Self {
        Self::new(range.start, range.end)
    }

    /// `true` when anchor and active coincide.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }

    /// `true` when the active end precedes the anchor.
    pub fn is_reversed(&self) -> bool {
        self.active < self.anchor
    }

    /// Smaller end.
    pub fn start(&self) -> Position {
        self.anchor.min(self.active)
    }

    /// Larger end.
    pub fn end(&self) -> Position {
        self.anchor.max(self.active)
    }

    /// Order-normalized range.
    pub fn range(&self) -> Range<Position> {
        self.start()..self.end()
    }

    /// `true` if `pos` lies inside or on the boundary of the selection.
    pub fn contains_inclusive(&self, pos: Position) -> bool {
        self.start() <= pos && pos <= self.end()
    }

    /// Smallest selection covering both, oriented like `self`.
    pub fn union(&self, other: &Selection) -> Selection {
        let start = self.start().min(other.start());
        let end = self.end().max(other.end());
        if self.is_reversed() {
            Selection::new(end, start)
        } else {
            Selection::new(start, end)
        }
    }

    /// Empty selection at the active end.
    pub fn collapsed(&self) -> Selection {
        Selection::caret(self.active)
    }
}

/// Decides which characters form words.
pub trait WordClassifier {
    /// `true` if `ch` is part of a word.
    fn is_word_char(&self, ch: char) -> bool;
}

/// Letters, digits and `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWordClassifier;

impl WordClassifier for DefaultWordClassifier {
    fn is_word_char(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_'
    }
}

impl<F> WordClassifier for F
where
    F: Fn(char) -> bool,
{
    fn is_word_char(&self, ch: char) -> bool {
        self(ch)
    }
}

fn line_chars(document: &dyn Document, line: usize) -> Vec<char> {
    document
        .line_text(line)
        .map(|t| t.chars().collect())
        .unwrap_or_default()
}

/// Range of the word under `pos`; empty when `pos` touches no word character.
pub fn word_range_at(
    document: &dyn Document,
    classifier: &dyn WordClassifier,
    pos: Position,
) -> Range<Position> {
    let chars = line_chars(document, pos.line);
    let column = pos.column.min(chars.len());
    let mut start = column;
    let mut end = column;
    while start > 0 && classifier.is_word_char(chars[start - 1]) {
        start -= 1;
    }
    while end < chars.len() && classifier.is_word_char(chars[end]) {
        end += 1;
    }
    if end <= start {
        return pos..pos;
    }
    Position::new(pos.line, start)..Position::new(pos.line, end)
}

/// Range of the whole of `line`: up to the next line start, or the line end on the last line.
pub fn line_range(document: &dyn Document, line: usize) -> Range<Position> {
    let start = Position::new(line, 0);
    if line + 1 >= document.line_count() {
        start..Position::new(line, document.line_length(line))
    } else {
        start..Position::new(line + 1, 0)
    }
}

/// Drag granularity, chosen by click count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Single click.
    #[default]
    Character,
    /// Double click.
    Word,
    /// Triple click.
    Line,
}

/// Drag state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    /// No drag in progress.
    #[default]
    Idle,
    /// Button held.
    Dragging {
        /// Mode fixed for the whole drag.
        mode: SelectionMode,
        /// Where the drag started.
        anchor: Position,
        /// Word or line selected by the initial click.
        cached: Range<Position>,
    },
}

/// Drag-selection state machine.
#[derive(Debug, Clone, Default)]
pub struct SelectionDrag {
    state: DragState,
}

impl SelectionDrag {
    /// Idle state machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// `true` while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Mode of the drag in progress.
    pub fn mode(&self) -> Option<SelectionMode> {
        match self.state {
            DragState::Dragging { mode, .. } => Some(mode),
            DragState::Idle => None,
        }
    }

    /// Start a drag at `pos` and return the initial selection.
    pub fn begin(
        &mut self,
        document: &dyn Document,
        classifier: &dyn WordClassifier,
        pos: Position,
        mode: SelectionMode,
    ) -> Selection {
        let cached = match mode {
            SelectionMode::Character => pos..pos,
            SelectionMode::Word => word_range_at(document, classifier, pos),
            SelectionMode::Line => line_range(document, pos.line),
        };
        let selection = Selection::from_range(cached.clone());
        tracing::trace!(?mode, %pos, "selection drag started");
        self.state = DragState::Dragging {
            mode,
            anchor: pos,
            cached,
        };
        selection
    }

    /// Extend the drag to `pos`. `None` when no drag is in progress.
    pub fn update(
        &mut self,
        document: &dyn Document,
        classifier: &dyn WordClassifier,
        pos: Position,
    ) -> Option<Selection> {
        let DragState::Dragging {
            mode,
            anchor,
            cached,
        } = &self.state
        else {
            return None;
        };
        let selection = match mode {
            SelectionMode::Character => Selection::new(*anchor, pos),
            SelectionMode::Word => extend_by_word(document, classifier, cached, pos),
            SelectionMode::Line => extend_by_line(document, cached, pos),
        };
        Some(selection)
    }

    /// Finish the drag, returning its mode.
    pub fn end(&mut self) -> Option<SelectionMode> {
        let mode = self.mode();
        self.state = DragState::Idle;
        mode
    }
}

fn extend_by_word(
    document: &dyn Document,
    classifier: &dyn WordClassifier,
    cached: &Range<Position>,
    pos: Position,
) -> Selection {
    let chars = line_chars(document, pos.line);
    let is_word = |i: usize| chars.get(i).is_some_and(|ch| classifier.is_word_char(*ch));

    if pos > cached.start {
        let mut c = pos.column.min(chars.len());
        if c > 0 && is_word(c - 1) {
            while c < chars.len() && is_word(c) {
                c += 1;
            }
        }
        Selection::new(cached.start, Position::new(pos.line, c))
    } else if pos < cached.start {
        let mut c = pos.column.min(chars.len());
        if c > 0 && c < chars.len() && is_word(c) && is_word(c - 1) {
            while c > 0 && is_word(c - 1) {
                c -= 1;
            }
        }
        Selection::new(cached.end, Position::new(pos.line, c))
    } else {
        Selection::from_range(cached.clone())
    }
}

fn extend_by_line(document: &dyn Document, cached: &Range<Position>, pos: Position) -> Selection {
    let line_count = document.line_count();
    if pos.line > cached.start.line {
        let active = if pos.line + 1 >= line_count {
            Position::new(pos.line, document.line_length(pos.line))
        } else {
            Position::new(pos.line + 1, 0)
        };
        Selection::new(Position::new(cached.start.line, 0), active)
    } else if pos.line < cached.start.line {
        let mut anchor = cached.end;
        if anchor.column > 0 {
            anchor = if anchor.line + 1 >= line_count {
                Position::new(anchor.line, document.line_length(anchor.line))
            } else {
                Position::new(anchor.line + 1, 0)
            };
        }
        Selection::new(anchor, Position::new(pos.line, 0))
    } else {
        Selection::from_range(cached.clone())
    }
}
