//! Multi-cursor set.
//!
//! A [`MultiCursor`] holds one primary [`Caret`] and any number of secondary ones, ordered by
//! position. After every mutation the set is normalized: carets that share a position or whose
//! selections overlap are merged into one caret covering the union, and the primary caret keeps
//! its identity through merges.
//!
//! Bulk moves apply one motion to every caret in a single pass and normalize once at the end.

use unicode_segmentation::UnicodeSegmentation;

use crate::document::{Document, TextChange};
use crate::position::Position;
use crate::selection::{Selection, WordClassifier};

/// A cursor with its (possibly empty) selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    /// Selection; the active end is the cursor position.
    pub selection: Selection,
    /// Sticky horizontal pixel position (row-relative) used by vertical moves.
    pub preferred_x: Option<u32>,
    order: u64,
}

impl Caret {
    /// Caret at `pos` with an empty selection.
    pub fn at(pos: Position) -> Self {
        Self::with_selection(Selection::caret(pos))
    }

    /// Caret with `selection`.
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            selection,
            preferred_x: None,
            order: 0,
        }
    }

    /// Cursor position (the active end).
    pub fn position(&self) -> Position {
        self.selection.active
    }

    /// `true` if the selection is not empty.
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }
}

/// Horizontal motions that need only the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Previous grapheme cluster, wrapping to the previous line end.
    CharLeft,
    /// Next grapheme cluster, wrapping to the next line start.
    CharRight,
    /// Start of the previous word.
    WordLeft,
    /// Start of the next word.
    WordRight,
    /// Line start (first non-blank with smart home).
    LineStart,
    /// Line end.
    LineEnd,
    /// Start of the document.
    DocumentStart,
    /// End of the document.
    DocumentEnd,
}

/// Settings consulted by caret motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOptions {
    /// Columns may pass the line end.
    pub virtual_space: bool,
    /// Home toggles between the first non-blank and column 0.
    pub smart_home: bool,
    /// Non-extending moves keep existing selections.
    pub persistent_selection: bool,
}

/// Primary caret plus secondary carets, ordered by position.
#[derive(Debug, Clone)]
pub struct MultiCursor {
    carets: Vec<Caret>,
    primary: usize,
    next_order: u64,
}

impl MultiCursor {
    /// One caret at the start of the document.
    pub fn new() -> Self {
        Self {
            carets: vec![Caret::at(Position::zero())],
            primary: 0,
            next_order: 1,
        }
    }

    /// All carets in position order.
    pub fn carets(&self) -> &[Caret] {
        &self.carets
    }

    /// The primary caret.
    pub fn primary(&self) -> &Caret {
        &self.carets[self.primary]
    }

    /// Index of the primary caret in [`carets`](Self::carets).
    pub fn primary_index(&self) -> usize {
        self.primary
    }

    /// Number of carets (at least 1).
    pub fn len(&self) -> usize {
        self.carets.len()
    }

    /// Always `false`: there is at least one caret.
    pub fn is_empty(&self) -> bool {
        self.carets.is_empty()
    }

    /// Primary cursor position.
    pub fn position(&self) -> Position {
        self.primary().position()
    }

    /// Every cursor position in order.
    pub fn positions(&self) -> Vec<Position> {
        self.carets.iter().map(Caret::position).collect()
    }

    /// Every selection in order.
    pub fn selections(&self) -> Vec<Selection> {
        self.carets.iter().map(|c| c.selection).collect()
    }

    /// `true` if any caret has a non-empty selection.
    pub fn has_selection(&self) -> bool {
        self.carets.iter().any(Caret::has_selection)
    }

    fn stamp(&mut self, mut caret: Caret) -> Caret {
        caret.order = self.next_order;
        self.next_order += 1;
        caret
    }

    /// Replace every caret with a single caret holding `selection`.
    pub fn reset(&mut self, selection: Selection) {
        let caret = self.stamp(Caret::with_selection(selection));
        self.carets = vec![caret];
        self.primary = 0;
    }

    /// Replace the primary caret's selection, keeping the secondaries.
    pub fn set_primary_selection(&mut self, selection: Selection) {
        let caret = &mut self.carets[self.primary];
        caret.selection = selection;
        caret.preferred_x = None;
        self.normalize();
    }

    /// Add a caret holding `selection` and make it primary.
    ///
    /// Returns `false` if it merged into an existing caret.
    pub fn add_selection(&mut self, selection: Selection) -> bool {
        let before = self.carets.len();
        let caret = self.stamp(Caret::with_selection(selection));
        self.carets.push(caret);
        self.primary = self.carets.len() - 1;
        self.normalize();
        self.carets.len() > before
    }

    /// Add an empty caret at `pos` and make it primary.
    pub fn add_cursor(&mut self, pos: Position) -> bool {
        self.add_selection(Selection::caret(pos))
    }

    /// Remove the caret at `pos` if there is one and it is not the only caret; otherwise add a
    /// caret there. Returns `true` if a caret was added.
    pub fn toggle_cursor(&mut self, pos: Position) -> bool {
        if self.carets.len() > 1
            && let Some(index) = self.carets.iter().position(|c| c.position() == pos)
        {
            self.remove_at(index);
            return false;
        }
        self.add_cursor(pos)
    }

    fn remove_at(&mut self, index: usize) {
        let was_primary = index == self.primary;
        self.carets.remove(index);
        if was_primary {
            self.primary = self.most_recent().unwrap_or(0);
        } else if index < self.primary {
            self.primary -= 1;
        }
    }

    fn most_recent(&self) -> Option<usize> {
        self.carets
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.order)
            .map(|(i, _)| i)
    }

    /// Remove the most recently added caret. Returns `false` when only one caret is left.
    pub fn remove_last_selection(&mut self) -> bool {
        if self.carets.len() < 2 {
            return false;
        }
        match self.most_recent() {
            Some(index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Keep only the primary caret.
    pub fn clear_secondary_cursors(&mut self) {
        let primary = self.carets[self.primary];
        self.carets = vec![primary];
        self.primary = 0;
    }

    /// Make caret `index` primary. Returns `false` for an out-of-range index.
    pub fn set_primary(&mut self, index: usize) -> bool {
        if index >= self.carets.len() {
            return false;
        }
        self.primary = index;
        true
    }

    /// Collapse every selection to its active end.
    pub fn collapse_selections(&mut self) {
        for caret in &mut self.carets {
            caret.selection = caret.selection.collapsed();
        }
        self.normalize();
    }

    /// One caret selecting the whole document.
    pub fn select_all(&mut self, document: &dyn Document) {
        self.reset(Selection::new(Position::zero(), document.end_position()));
    }

    /// One caret per line between `anchor` and `active`, each spanning the same columns.
    ///
    /// Columns are clamped to each line unless `virtual_space` is set. The caret on the
    /// active line becomes primary.
    pub fn set_block_selection(
        &mut self,
        document: &dyn Document,
        anchor: Position,
        active: Position,
        virtual_space: bool,
    ) {
        let last = document.line_count().saturating_sub(1);
        let start_line = anchor.line.min(active.line).min(last);
        let end_line = anchor.line.max(active.line).min(last);

        let mut carets = Vec::with_capacity(end_line - start_line + 1);
        let mut primary = 0;
        for line in start_line..=end_line {
            let len = document.line_length(line);
            let clamp = |column: usize| if virtual_space { column } else { column.min(len) };
            let selection = Selection::new(
                Position::new(line, clamp(anchor.column)),
                Position::new(line, clamp(active.column)),
            );
            if line == active.line.min(last) {
                primary = carets.len();
            }
            let caret = self.stamp(Caret::with_selection(selection));
            carets.push(caret);
        }
        self.carets = carets;
        self.primary = primary;
        self.normalize();
    }

    /// Move every caret to the position returned by `motion`.
    ///
    /// With `extend`, anchors stay put. Otherwise selections collapse to the new position,
    /// unless `persistent` is set and the caret has a selection. Returns `true` if anything
    /// changed.
    pub fn move_all<F>(&mut self, extend: bool, persistent: bool, mut motion: F) -> bool
    where
        F: FnMut(&Caret) -> (Position, Option<u32>),
    {
        let before = self.carets.clone();
        for caret in &mut self.carets {
            let (pos, preferred_x) = motion(caret);
            if extend || (persistent && caret.has_selection()) {
                caret.selection.active = pos;
            } else {
                caret.selection = Selection::caret(pos);
            }
            caret.preferred_x = preferred_x;
        }
        self.normalize();
        self.carets != before
    }

    /// Apply a document-only motion to every caret.
    pub fn move_by(
        &mut self,
        document: &dyn Document,
        classifier: &dyn WordClassifier,
        motion: Motion,
        extend: bool,
        options: MoveOptions,
    ) -> bool {
        self.move_all(extend, options.persistent_selection, |caret| {
            let pos = caret.position();
            let next = match motion {
                Motion::CharLeft => char_left(document, pos, options.virtual_space),
                Motion::CharRight => char_right(document, pos, options.virtual_space),
                Motion::WordLeft => word_left(document, classifier, pos),
                Motion::WordRight => word_right(document, classifier, pos),
                Motion::LineStart => line_start(document, pos, options.smart_home),
                Motion::LineEnd => Position::new(pos.line, document.line_length(pos.line)),
                Motion::DocumentStart => Position::zero(),
                Motion::DocumentEnd => document.end_position(),
            };
            (next, None)
        })
    }

    /// Clamp every caret into the document. Columns may pass the line end with
    /// `virtual_space`.
    pub fn clamp(&mut self, document: &dyn Document, virtual_space: bool) {
        let clamp = |pos: Position| {
            let line = pos.line.min(document.line_count().saturating_sub(1));
            let column = if virtual_space {
                pos.column
            } else {
                pos.column.min(document.line_length(line))
            };
            Position::new(line, column)
        };
        for caret in &mut self.carets {
            caret.selection.anchor = clamp(caret.selection.anchor);
            caret.selection.active = clamp(caret.selection.active);
        }
        self.normalize();
    }

    /// Move carets with an edit: carets after an insertion shift, carets inside a removed
    /// range collapse to its start.
    pub fn apply_text_change(&mut self, change: &TextChange) {
        for caret in &mut self.carets {
            caret.selection.anchor = change.map_position(caret.selection.anchor);
            caret.selection.active = change.map_position(caret.selection.active);
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.carets.is_empty() {
            self.carets.push(Caret::at(Position::zero()));
            self.primary = 0;
            return;
        }
        let primary_order = self.carets[self.primary.min(self.carets.len() - 1)].order;

        let mut carets = std::mem::take(&mut self.carets);
        carets.sort_by(|a, b| {
            let (a_min, a_max) = (a.selection.start(), a.selection.end());
            let (b_min, b_max) = (b.selection.start(), b.selection.end());
            a_min
                .cmp(&b_min)
                .then_with(|| a_max.cmp(&b_max))
                .then_with(|| a.selection.active.cmp(&b.selection.active))
                .then_with(|| a.selection.anchor.cmp(&b.selection.anchor))
        });

        // Merge overlapping selections and carets sharing a position.
        let mut merged: Vec<Caret> = Vec::with_capacity(carets.len());
        for caret in carets {
            let Some(last) = merged.last_mut() else {
                merged.push(caret);
                continue;
            };
            let last_max = last.selection.end();
            let sel_min = caret.selection.start();
            let overlaps = sel_min < last_max;
            let touches = sel_min == last_max
                && (last.selection.is_empty()
                    || caret.selection.is_empty()
                    || last.selection.active == caret.selection.active);
            if overlaps || touches {
                let (keep, other) = if caret.order == primary_order {
                    (caret, *last)
                } else {
                    (*last, caret)
                };
                *last = Caret {
                    selection: keep.selection.union(&other.selection),
                    preferred_x: keep.preferred_x,
                    order: keep.order,
                };
            } else {
                merged.push(caret);
            }
        }

        self.primary = merged
            .iter()
            .position(|c| c.order == primary_order)
            .unwrap_or(merged.len() - 1);
        self.carets = merged;
    }
}

impl Default for MultiCursor {
    fn default() -> Self {
        Self::new()
    }
}

fn line_chars(document: &dyn Document, line: usize) -> Vec<char> {
    document
        .line_text(line)
        .map(|t| t.chars().collect())
        .unwrap_or_default()
}

/// Character-column boundaries of the grapheme clusters of `text`, including 0 and the length.
pub fn grapheme_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = Vec::with_capacity(text.len() + 1);
    let mut column = 0;
    boundaries.push(0);
    for grapheme in text.graphemes(true) {
        column += grapheme.chars().count();
        boundaries.push(column);
    }
    boundaries
}

/// Previous grapheme boundary, or the end of the previous line from column 0.
pub fn char_left(document: &dyn Document, pos: Position, virtual_space: bool) -> Position {
    let len = document.line_length(pos.line);
    if pos.column > len {
        return if virtual_space {
            pos.with_column(pos.column - 1)
        } else {
            pos.with_column(len)
        };
    }
    if pos.column == 0 {
        return match pos.line.checked_sub(1) {
            Some(prev) => Position::new(prev, document.line_length(prev)),
            None => pos,
        };
    }
    let text = document.line_text(pos.line).unwrap_or_default();
    let column = grapheme_boundaries(&text)
        .into_iter()
        .rev()
        .find(|b| *b < pos.column)
        .unwrap_or(0);
    pos.with_column(column)
}

/// Next grapheme boundary, or the start of the next line from the line end.
///
/// With `virtual_space` the caret keeps moving right past the line end instead.
pub fn char_right(document: &dyn Document, pos: Position, virtual_space: bool) -> Position {
    let len = document.line_length(pos.line);
    if pos.column >= len {
        if virtual_space {
            return pos.with_column(pos.column + 1);
        }
        if pos.line + 1 < document.line_count() {
            return Position::new(pos.line + 1, 0);
        }
        return pos.with_column(len);
    }
    let text = document.line_text(pos.line).unwrap_or_default();
    let column = grapheme_boundaries(&text)
        .into_iter()
        .find(|b| *b > pos.column)
        .unwrap_or(len);
    pos.with_column(column)
}

/// Start of the next word: skips the run of the class under the caret (word characters or
/// other non-blank characters), then any whitespace. At a line end, moves to the next line.
pub fn word_right(
    document: &dyn Document,
    classifier: &dyn WordClassifier,
    pos: Position,
) -> Position {
    let mut line = pos.line;
    let mut chars = line_chars(document, line);
    let mut col = pos.column.min(chars.len());
    let is_word = |ch: char| classifier.is_word_char(ch);

    if col >= chars.len() {
        if line + 1 < document.line_count() {
            line += 1;
            chars = line_chars(document, line);
            col = 0;
        }
    } else if is_word(chars[col]) {
        while col < chars.len() && is_word(chars[col]) {
            col += 1;
        }
    } else {
        while col < chars.len() && !is_word(chars[col]) && !chars[col].is_whitespace() {
            col += 1;
        }
    }
    while col < chars.len() && chars[col].is_whitespace() {
        col += 1;
    }
    Position::new(line, col)
}

/// Start of the previous word: skips whitespace, then the run of the class before the caret.
/// At a line start, moves to the end of the previous line.
pub fn word_left(
    document: &dyn Document,
    classifier: &dyn WordClassifier,
    pos: Position,
) -> Position {
    let chars = line_chars(document, pos.line);
    let mut col = pos.column.min(chars.len());
    let is_word = |ch: char| classifier.is_word_char(ch);

    while col > 0 && chars[col - 1].is_whitespace() {
        col -= 1;
    }
    if col == 0 {
        if let Some(prev) = pos.line.checked_sub(1)
            && pos.column.min(chars.len()) == 0
        {
            return Position::new(prev, document.line_length(prev));
        }
        return Position::new(pos.line, 0);
    }
    if is_word(chars[col - 1]) {
        while col > 0 && is_word(chars[col - 1]) {
            col -= 1;
        }
    } else {
        while col > 0 && !is_word(chars[col - 1]) && !chars[col - 1].is_whitespace() {
            col -= 1;
        }
    }
    Position::new(pos.line, col)
}

/// Line start. With `smart`, the first non-blank column unless already there.
pub fn line_start(document: &dyn Document, pos: Position, smart: bool) -> Position {
    if !smart {
        return pos.with_column(0);
    }
    let first_non_blank = line_chars(document, pos.line)
        .iter()
        .position(|ch| !ch.is_whitespace());
    match first_non_blank {
        Some(column) if column != pos.column => pos.with_column(column),
        _ => pos.with_column(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use crate::selection::DefaultWordClassifier;

    fn p(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    fn doc() -> TextDocument {
        TextDocument::from_text("fn main() {\n    let x = 1;\n}")
    }

    #[test]
    fn test_independent_carets_move_together() {
        let doc = doc();
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::caret(p(1, 3)));
        assert!(cursors.add_cursor(p(1, 10)));

        cursors.move_by(
            &doc,
            &DefaultWordClassifier,
            Motion::CharRight,
            false,
            MoveOptions::default(),
        );
        assert_eq!(cursors.positions(), vec![p(1, 4), p(1, 11)]);
        assert_eq!(cursors.primary().position(), p(1, 11));
    }

    #[test]
    fn test_carets_meeting_merge_and_primary_survives() {
        let doc = doc();
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::caret(p(1, 4)));
        cursors.add_cursor(p(1, 5));
        assert_eq!(cursors.len(), 2);

        cursors.move_by(
            &doc,
            &DefaultWordClassifier,
            Motion::LineStart,
            false,
            MoveOptions::default(),
        );
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors.position(), p(1, 0));
    }

    #[test]
    fn test_overlapping_selections_merge_into_union() {
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::new(p(0, 0), p(0, 5)));
        cursors.add_selection(Selection::new(p(0, 8), p(0, 3)));
        assert_eq!(cursors.len(), 1);
        // The added caret was primary, so its orientation wins.
        assert_eq!(cursors.primary().selection, Selection::new(p(0, 8), p(0, 0)));

        // Touching non-empty selections with distinct carets stay apart.
        cursors.reset(Selection::new(p(0, 0), p(0, 2)));
        cursors.add_selection(Selection::new(p(0, 2), p(0, 4)));
        assert_eq!(cursors.len(), 2);

        // An empty caret on a selection boundary is absorbed.
        cursors.add_cursor(p(0, 4));
        assert_eq!(cursors.len(), 2);
    }

    #[test]
    fn test_toggle_and_remove_last() {
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::caret(p(0, 1)));
        assert!(cursors.toggle_cursor(p(1, 1)));
        assert!(cursors.toggle_cursor(p(2, 0)));
        assert_eq!(cursors.len(), 3);

        assert!(!cursors.toggle_cursor(p(1, 1)));
        assert_eq!(cursors.positions(), vec![p(0, 1), p(2, 0)]);

        assert!(cursors.remove_last_selection());
        assert_eq!(cursors.positions(), vec![p(0, 1)]);
        assert!(!cursors.remove_last_selection());
        // The last caret cannot be toggled away.
        assert!(!cursors.toggle_cursor(p(0, 1)));
        assert_eq!(cursors.len(), 1);
    }

    #[test]
    fn test_plain_move_collapses_all_selections() {
        let doc = doc();
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::new(p(0, 0), p(0, 2)));
        cursors.add_selection(Selection::new(p(1, 4), p(1, 7)));

        cursors.move_by(
            &doc,
            &DefaultWordClassifier,
            Motion::CharLeft,
            false,
            MoveOptions::default(),
        );
        assert!(!cursors.has_selection());
        assert_eq!(cursors.positions(), vec![p(0, 1), p(1, 6)]);

        cursors.move_by(
            &doc,
            &DefaultWordClassifier,
            Motion::WordRight,
            true,
            MoveOptions::default(),
        );
        assert_eq!(
            cursors.selections(),
            vec![Selection::new(p(0, 1), p(0, 3)), Selection::new(p(1, 6), p(1, 8))]
        );
    }

    #[test]
    fn test_word_motions() {
        let doc = doc();
        let c = DefaultWordClassifier;
        assert_eq!(word_right(&doc, &c, p(0, 0)), p(0, 3));
        assert_eq!(word_right(&doc, &c, p(0, 3)), p(0, 7));
        assert_eq!(word_right(&doc, &c, p(0, 11)), p(1, 4));
        assert_eq!(word_left(&doc, &c, p(1, 4)), p(1, 0));
        assert_eq!(word_left(&doc, &c, p(1, 0)), p(0, 11));
        assert_eq!(word_left(&doc, &c, p(0, 7)), p(0, 3));
    }

    #[test]
    fn test_grapheme_aware_char_moves() {
        let doc = TextDocument::from_text("e\u{301}x\nab");
        assert_eq!(grapheme_boundaries("e\u{301}x"), vec![0, 2, 3]);
        assert_eq!(char_right(&doc, p(0, 0), false), p(0, 2));
        assert_eq!(char_left(&doc, p(0, 2), false), p(0, 0));
        assert_eq!(char_right(&doc, p(0, 3), false), p(1, 0));
        assert_eq!(char_left(&doc, p(1, 0), false), p(0, 3));
        assert_eq!(char_right(&doc, p(1, 2), true), p(1, 3));
        assert_eq!(char_left(&doc, p(1, 5), false), p(1, 2));
        assert_eq!(char_right(&doc, p(1, 2), false), p(1, 2));
    }

    #[test]
    fn test_smart_home() {
        let doc = doc();
        assert_eq!(line_start(&doc, p(1, 8), true), p(1, 4));
        assert_eq!(line_start(&doc, p(1, 4), true), p(1, 0));
        assert_eq!(line_start(&doc, p(1, 8), false), p(1, 0));
    }

    #[test]
    fn test_block_selection_clamps_columns() {
        let doc = TextDocument::from_text("abcdef\nab\nabcdefgh");
        let mut cursors = MultiCursor::new();
        cursors.set_block_selection(&doc, p(0, 1), p(2, 4), false);
        assert_eq!(
            cursors.selections(),
            vec![
                Selection::new(p(0, 1), p(0, 4)),
                Selection::new(p(1, 1), p(1, 2)),
                Selection::new(p(2, 1), p(2, 4)),
            ]
        );
        assert_eq!(cursors.primary_index(), 2);

        cursors.set_block_selection(&doc, p(0, 1), p(2, 4), true);
        assert_eq!(cursors.carets()[1].selection, Selection::new(p(1, 1), p(1, 4)));
    }

    #[test]
    fn test_edits_move_carets() {
        let mut doc = doc();
        let mut cursors = MultiCursor::new();
        cursors.reset(Selection::caret(p(1, 8)));
        cursors.add_cursor(p(2, 0));

        let change = doc.insert(p(1, 0), "// ").unwrap();
        cursors.apply_text_change(&change);
        assert_eq!(cursors.positions(), vec![p(1, 11), p(2, 0)]);

        let change = doc.remove(p(0, 5)..p(2, 0)).unwrap();
        cursors.apply_text_change(&change);
        assert_eq!(cursors.positions(), vec![p(0, 5)]);
    }
}
