//! Layout cache: laid-out lines and the rows of the current viewport.
//!
//! # Overview
//!
//! Laying out a line (running [`segment_line`] over its text) is the expensive part of
//! drawing an editor, so it is done lazily and kept in a sliding window around the viewport:
//!
//! - [`LineLayout`]: one real line cut into [`Segment`]s, keyed by real line index.
//! - the *view cache*: the rows currently on screen, each an `Option<ViewLine>` (`None` for
//!   rows past the end of the document) plus a repaint-dirty flag.
//!
//! [`LayoutCache::update_view_cache`] rebuilds the rows from a display start position. When it
//! is told how many rows the view just scrolled by, it shifts the old rows first, so rows that
//! only moved on screen are not flagged dirty and can be blitted instead of repainted.
//!
//! Line layouts are evicted once they fall outside the window plus a margin. Edits re-key the
//! cached layouts below the edit instead of dropping them.
//!
//! All operations that may lay out lines take a [`ViewContext`].

use std::collections::BTreeMap;

use crate::context::ViewContext;
use crate::coords;
use crate::document::TextChange;
use crate::layout::{
    Segment, SegmentOptions, WrapIndent, WrapMode, segment_line, segments_are_valid,
};
use crate::metrics::Renderer;
use crate::position::{DisplayPosition, Position};

/// Laid-out lines kept beyond the viewport on each side, at minimum.
pub const EVICTION_MARGIN: usize = 32;

/// Lines below the viewport laid out ahead of time.
pub const PREFETCH_LINES: usize = 4;

/// One real line laid out into view-line segments.
#[derive(Debug, Clone)]
pub struct LineLayout {
    line: usize,
    display_line: usize,
    text: String,
    len: usize,
    segments: Vec<Segment>,
    layout_dirty: bool,
}

impl LineLayout {
    /// Real line index.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Display line (as of the last lookup).
    pub fn display_line(&self) -> usize {
        self.display_line
    }

    /// Line text without terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` for an empty line.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Segments in column order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of view lines (at least 1).
    pub fn view_line_count(&self) -> usize {
        self.segments.len()
    }

    /// `true` if the text changed since this layout was computed.
    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    /// Index of the segment holding a caret at `column`.
    ///
    /// A caret at a wrap point belongs to the following row; carets past the end of the
    /// line belong to the last row.
    pub fn view_line_for_column(&self, column: usize) -> usize {
        if column == 0 {
            return 0;
        }
        self.segments
            .iter()
            .position(|s| column >= s.start_col && column < s.end_col)
            .unwrap_or(self.segments.len() - 1)
    }

    /// Widest row in pixels, indent included.
    pub fn width(&self) -> u32 {
        self.segments.iter().map(Segment::extent).max().unwrap_or(0)
    }

    /// View line `index` as a [`ViewLine`].
    pub fn view_line(&self, index: usize) -> Option<ViewLine> {
        let segment = *self.segments.get(index)?;
        Some(ViewLine {
            line: self.line,
            display_line: self.display_line,
            view_line: index,
            view_line_count: self.segments.len(),
            segment,
        })
    }

    /// Pixel x of `column` on its row, measured from the row's left edge.
    pub fn column_to_row_x(&self, renderer: &dyn Renderer, column: usize) -> u32 {
        let seg = &self.segments[self.view_line_for_column(column)];
        let x = renderer.column_to_x(&self.text, column);
        seg.indent + x.saturating_sub(seg.start_x)
    }

    /// Column under pixel `x` (row-relative) on row `view_line`.
    ///
    /// The column is clamped to the row. On the last row it may pass the end of the line when
    /// `allow_virtual` is set.
    pub fn row_x_to_column(
        &self,
        renderer: &dyn Renderer,
        view_line: usize,
        x: u32,
        allow_virtual: bool,
    ) -> usize {
        let Some(seg) = self.segments.get(view_line) else {
            return self.len;
        };
        if x <= seg.indent {
            return seg.start_col;
        }
        let line_x = seg.start_x.saturating_add(x - seg.indent);
        let column = renderer
            .x_to_column(&self.text, line_x)
            .max(seg.start_col);
        if seg.wraps {
            column.min(seg.max_caret_column())
        } else if allow_virtual {
            column
        } else {
            column.min(seg.end_col)
        }
    }
}

/// A copyable reference to one row: a segment of a laid-out line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLine {
    /// Real line.
    pub line: usize,
    /// Display line.
    pub display_line: usize,
    /// Segment index within the line.
    pub view_line: usize,
    /// Number of segments of the line.
    pub view_line_count: usize,
    /// The segment itself.
    pub segment: Segment,
}

impl ViewLine {
    /// First column of the row.
    pub fn start_col(&self) -> usize {
        self.segment.start_col
    }

    /// End column (exclusive).
    pub fn end_col(&self) -> usize {
        self.segment.end_col
    }

    /// `true` if the line continues on the next row.
    pub fn wraps(&self) -> bool {
        self.segment.wraps
    }

    /// `true` for the first row of a line.
    pub fn is_first(&self) -> bool {
        self.view_line == 0
    }

    /// `true` for the last row of a line.
    pub fn is_last(&self) -> bool {
        self.view_line + 1 == self.view_line_count
    }

    /// Display position of the row start.
    pub fn start(&self) -> DisplayPosition {
        DisplayPosition::new(self.display_line, self.segment.start_col)
    }

    /// Last caret position on the row in display coordinates.
    pub fn end(&self) -> DisplayPosition {
        DisplayPosition::new(self.display_line, self.segment.max_caret_column())
    }

    /// Real position of the row start.
    pub fn real_start(&self) -> Position {
        Position::new(self.line, self.segment.start_col)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RowSlot {
    line: Option<ViewLine>,
    dirty: bool,
}

/// Sliding-window cache of line layouts plus the rows of the viewport.
#[derive(Debug)]
pub struct LayoutCache {
    lines: BTreeMap<usize, LineLayout>,
    rows: Vec<RowSlot>,
    start: DisplayPosition,
    view_width: Option<u32>,
    wrap: bool,
    wrap_mode: WrapMode,
    wrap_indent: WrapIndent,
    accept_dirty_layouts: bool,
}

impl LayoutCache {
    /// Empty cache: no wrapping, unbounded width.
    pub fn new() -> Self {
        Self {
            lines: BTreeMap::new(),
            rows: Vec::new(),
            start: DisplayPosition::zero(),
            view_width: None,
            wrap: false,
            wrap_mode: WrapMode::Word,
            wrap_indent: WrapIndent::None,
            accept_dirty_layouts: false,
        }
    }

    /// Set the wrap width in pixels. Zero or negative widths disable wrapping geometry (every
    /// line becomes a single segment) until a positive width arrives.
    pub fn set_view_width(&mut self, width: i32) {
        let width = u32::try_from(width).ok().filter(|w| *w > 0);
        if self.view_width != width {
            tracing::debug!(?width, "layout width changed");
            self.view_width = width;
            if self.wrap {
                self.clear_layouts();
            }
        }
    }

    /// Current wrap width (`None` = unbounded).
    pub fn view_width(&self) -> Option<u32> {
        self.view_width
    }

    /// Enable or disable soft wrapping.
    pub fn set_wrap(&mut self, wrap: bool) {
        if self.wrap != wrap {
            tracing::debug!(wrap, "soft wrap toggled");
            self.wrap = wrap;
            self.clear_layouts();
        }
    }

    /// Whether soft wrapping is enabled.
    pub fn wrap(&self) -> bool {
        self.wrap
    }

    /// Choose between character and word boundary wrapping.
    ///
    /// [`WrapMode::None`] is treated like disabling wrap.
    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        if self.wrap_mode != mode {
            self.wrap_mode = mode;
            self.clear_layouts();
        }
    }

    /// Current wrap mode.
    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    /// Set the continuation indent policy.
    pub fn set_wrap_indent(&mut self, indent: WrapIndent) {
        if self.wrap_indent != indent {
            self.wrap_indent = indent;
            self.clear_layouts();
        }
    }

    /// Allow lookups to reuse layouts marked dirty instead of recomputing them.
    pub fn set_accept_dirty_layouts(&mut self, accept: bool) {
        self.accept_dirty_layouts = accept;
    }

    /// Drop every line layout and every row.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.rows.clear();
    }

    /// Drop every line layout, keeping the rows for dirty comparison.
    pub fn clear_layouts(&mut self) {
        self.lines.clear();
    }

    /// Mark the layouts of real lines `from..=to` for recomputation on next use.
    ///
    /// Lines outside the cache window are not loaded.
    pub fn relayout_lines(&mut self, from: usize, to: usize) {
        if from > to {
            return;
        }
        for layout in self.lines.range_mut(from..=to).map(|(_, l)| l) {
            layout.layout_dirty = true;
        }
    }

    /// Number of laid-out lines currently held.
    pub fn cached_line_count(&self) -> usize {
        self.lines.len()
    }

    /// `true` if the layout of `line` is held (dirty or not).
    pub fn is_line_cached(&self, line: usize) -> bool {
        self.lines.contains_key(&line)
    }

    /// Layout of real line `line`, computing it if needed. `None` past the end of the document.
    pub fn line(&mut self, ctx: &ViewContext<'_>, line: usize) -> Option<&LineLayout> {
        if line >= ctx.document.line_count() {
            return None;
        }
        let display_line = ctx.folding.line_to_visible_line(line);
        let needs_layout = match self.lines.get_mut(&line) {
            Some(layout) if !layout.layout_dirty || self.accept_dirty_layouts => {
                layout.display_line = display_line;
                false
            }
            _ => true,
        };
        if needs_layout {
            let layout = self.layout_line(ctx, line, display_line);
            self.lines.insert(line, layout);
        }
        self.lines.get(&line)
    }

    fn layout_line(&self, ctx: &ViewContext<'_>, line: usize, display_line: usize) -> LineLayout {
        let text = ctx.document.line_text(line).unwrap_or_default();
        let options = self.segment_options();
        let mut segments = segment_line(&text, ctx.renderer, options);
        let len = text.chars().count();
        let valid = segments_are_valid(&segments, len);
        debug_assert!(valid, "segmentation of line {line} does not partition it");
        if !valid {
            tracing::warn!(line, "invalid segmentation, falling back to a single row");
            segments = segment_line(&text, ctx.renderer, SegmentOptions::unwrapped());
        }
        tracing::trace!(line, rows = segments.len(), "laid out line");
        LineLayout {
            line,
            display_line,
            text,
            len,
            segments,
            layout_dirty: false,
        }
    }

    fn segment_options(&self) -> SegmentOptions {
        if !self.wrap || self.wrap_mode == WrapMode::None {
            return SegmentOptions::unwrapped();
        }
        SegmentOptions {
            width: self.view_width,
            mode: self.wrap_mode,
            indent: self.wrap_indent,
        }
    }

    /// Number of view lines of real line `line` (1 for lines past the end).
    pub fn view_line_count(&mut self, ctx: &ViewContext<'_>, line: usize) -> usize {
        self.line(ctx, line).map_or(1, LineLayout::view_line_count)
    }

    /// Index of the last view line of real line `line`.
    pub fn last_view_line(&mut self, ctx: &ViewContext<'_>, line: usize) -> usize {
        self.view_line_count(ctx, line) - 1
    }

    /// Row index within its line of a real caret position.
    pub fn view_line_for_column(&mut self, ctx: &ViewContext<'_>, pos: Position) -> usize {
        if pos.column == 0 {
            return 0;
        }
        self.line(ctx, pos.line)
            .map_or(0, |l| l.view_line_for_column(pos.column))
    }

    /// View line `view_line` of real line `line` (`None` = last view line).
    pub fn text_layout(
        &mut self,
        ctx: &ViewContext<'_>,
        line: usize,
        view_line: Option<usize>,
    ) -> Option<ViewLine> {
        let layout = self.line(ctx, line)?;
        let index = view_line.unwrap_or(layout.view_line_count() - 1);
        layout.view_line(index)
    }

    /// The row holding a real caret position.
    pub fn text_layout_at(&mut self, ctx: &ViewContext<'_>, pos: Position) -> Option<ViewLine> {
        let index = self.view_line_for_column(ctx, pos);
        self.text_layout(ctx, pos.line, Some(index))
    }

    /// Rebuild the rows so that row 0 shows `start` and `rows` rows are held.
    ///
    /// `scrolled` is the number of rows the content moved up since the previous call
    /// (negative when scrolling towards the top), or 0 if unknown. Rows that merely moved keep
    /// their clean state.
    pub fn update_view_cache(
        &mut self,
        ctx: &ViewContext<'_>,
        start: DisplayPosition,
        rows: usize,
        scrolled: isize,
    ) {
        let old_count = self.rows.len();
        let mut current = Some(ctx.folding.visible_line_to_line(start.line));
        let mut view_line = 0usize;
        if self.wrap
            && let Some(real) = current
            && let Some(layout) = self.line(ctx, real)
        {
            view_line = layout.view_line_for_column(start.column);
        }
        self.start = start;

        if scrolled > 0 {
            let shift = scrolled as usize;
            for z in 0..old_count.saturating_sub(shift) {
                self.rows[z] = self.rows[z + shift];
            }
        } else if scrolled < 0 {
            let shift = scrolled.unsigned_abs();
            for z in (shift..old_count).rev() {
                self.rows[z] = self.rows[z - shift];
            }
        }

        if rows < old_count {
            self.rows.truncate(rows);
        } else {
            self.rows.resize(
                rows,
                RowSlot {
                    line: None,
                    dirty: true,
                },
            );
        }

        for i in 0..rows {
            let next = match current {
                Some(real) => self.text_layout(ctx, real, Some(view_line)),
                None => None,
            };
            let slot = &mut self.rows[i];
            let Some(next) = next else {
                if slot.line.is_some() {
                    slot.dirty = true;
                }
                slot.line = None;
                current = None;
                continue;
            };
            let changed = match slot.line {
                Some(old) => {
                    old.line != next.line
                        || old.view_line != next.view_line
                        || old.segment != next.segment
                }
                None => true,
            };
            slot.line = Some(next);
            if changed {
                slot.dirty = true;
            }

            view_line += 1;
            if view_line >= next.view_line_count {
                view_line = 0;
                current = coords::to_real_line(ctx.folding, next.display_line + 1);
            }
        }

        self.prefetch(ctx, current);
        self.evict_outside_window(rows);
    }

    fn prefetch(&mut self, ctx: &ViewContext<'_>, mut next: Option<usize>) {
        for _ in 0..PREFETCH_LINES {
            let Some(real) = next else {
                return;
            };
            let Some(display) = self.line(ctx, real).map(LineLayout::display_line) else {
                return;
            };
            next = coords::to_real_line(ctx.folding, display + 1);
        }
    }

    fn evict_outside_window(&mut self, rows: usize) {
        let (Some(first), Some(last)) = (self.first_real_line(), self.last_real_line()) else {
            return;
        };
        let margin = rows.max(EVICTION_MARGIN);
        let low = first.saturating_sub(margin);
        let high = last.saturating_add(margin);
        let before = self.lines.len();
        self.lines.retain(|line, _| *line >= low && *line <= high);
        let evicted = before - self.lines.len();
        if evicted > 0 {
            tracing::trace!(evicted, low, high, "evicted line layouts");
        }
    }

    /// Display position the rows were last built from.
    pub fn view_cache_start(&self) -> DisplayPosition {
        self.start
    }

    /// Number of rows held.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row `row`, or `None` if out of range or past the end of the document.
    pub fn view_line(&self, row: usize) -> Option<ViewLine> {
        self.rows.get(row).and_then(|slot| slot.line)
    }

    /// All rows in order.
    pub fn view_lines(&self) -> impl Iterator<Item = Option<ViewLine>> + '_ {
        self.rows.iter().map(|slot| slot.line)
    }

    /// Last row that shows document content.
    pub fn last_valid_view_line(&self) -> Option<ViewLine> {
        self.rows.iter().rev().find_map(|slot| slot.line)
    }

    fn first_real_line(&self) -> Option<usize> {
        self.rows.iter().find_map(|slot| slot.line).map(|l| l.line)
    }

    fn last_real_line(&self) -> Option<usize> {
        self.last_valid_view_line().map(|l| l.line)
    }

    /// Whether row `row` needs repainting.
    pub fn is_row_dirty(&self, row: usize) -> bool {
        self.rows.get(row).is_some_and(|slot| slot.dirty)
    }

    /// Set or clear the dirty flag of row `row`.
    pub fn set_row_dirty(&mut self, row: usize, dirty: bool) {
        if let Some(slot) = self.rows.get_mut(row) {
            slot.dirty = dirty;
        }
    }

    /// Flag every row dirty.
    pub fn mark_all_rows_dirty(&mut self) {
        for slot in &mut self.rows {
            slot.dirty = true;
        }
    }

    /// Rows showing any real line in `from..=to`.
    pub fn rows_for_lines(&self, from: usize, to: usize) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(row, slot)| {
                slot.line
                    .filter(|l| l.line >= from && l.line <= to)
                    .map(|_| row)
            })
            .collect()
    }

    /// Widest row currently on screen, in pixels.
    pub fn max_row_width(&self) -> u32 {
        self.rows
            .iter()
            .filter_map(|slot| slot.line)
            .map(|l| l.segment.extent())
            .max()
            .unwrap_or(0)
    }

    /// Offset in rows of display position `cursor` from the view cache start.
    ///
    /// With `limit_to_visible`, returns `None` when the position is not on a cached row.
    pub fn display_view_line(
        &mut self,
        ctx: &ViewContext<'_>,
        cursor: DisplayPosition,
        limit_to_visible: bool,
    ) -> Option<isize> {
        let work_line = self.start.line;
        let limit = self.rows.len() as isize;

        if !self.wrap {
            let ret = cursor.line as isize - work_line as isize;
            if limit_to_visible && (ret < 0 || ret >= limit) {
                return None;
            }
            return Some(ret);
        }

        if cursor == self.start {
            return Some(0);
        }

        let start_real = coords::to_real(ctx.folding, self.start);
        let mut ret = -(self.view_line_for_column(ctx, start_real) as isize);
        let mut work = work_line;
        if work < cursor.line {
            while work != cursor.line {
                let real = ctx.folding.visible_line_to_line(work);
                ret += self.view_line_count(ctx, real) as isize;
                work += 1;
                if limit_to_visible && ret >= limit {
                    return None;
                }
            }
        } else {
            while work != cursor.line {
                work -= 1;
                let real = ctx.folding.visible_line_to_line(work);
                ret -= self.view_line_count(ctx, real) as isize;
                if limit_to_visible && ret < 0 {
                    return None;
                }
            }
        }

        let real = coords::to_real(ctx.folding, cursor);
        ret += self.view_line_for_column(ctx, real) as isize;
        if limit_to_visible && (ret < 0 || ret >= limit) {
            return None;
        }
        Some(ret)
    }

    /// Re-key cached layouts after an edit and flag affected rows dirty.
    ///
    /// Must be called before the rows are rebuilt for the post-edit document.
    pub fn apply_text_change(&mut self, change: &TextChange) {
        let first = change.start.line;
        let delta = change.line_delta();

        if change.is_single_line() {
            if let Some(layout) = self.lines.get_mut(&first) {
                layout.layout_dirty = true;
            }
        } else {
            let tail = self.lines.split_off(&(change.old_end.line + 1));
            self.lines.retain(|line, _| *line < first);
            for (line, mut layout) in tail {
                let new_line = (line as isize + delta) as usize;
                layout.line = new_line;
                self.lines.insert(new_line, layout);
            }
        }

        for slot in &mut self.rows {
            if let Some(l) = slot.line
                && (l.line == first || (delta != 0 && l.line > first))
            {
                slot.dirty = true;
            }
        }
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, TextDocument};
    use crate::folding::{FoldRegion, FoldingManager, NoFolding};
    use crate::metrics::CellMetrics;

    fn wrapped_cache(width: i32) -> LayoutCache {
        let mut cache = LayoutCache::new();
        cache.set_wrap(true);
        cache.set_wrap_mode(WrapMode::Char);
        cache.set_view_width(width);
        cache
    }

    #[test]
    fn test_long_line_wraps_into_segments() {
        let doc = TextDocument::from_text(&"x".repeat(500));
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(50);

        let layout = cache.line(&ctx, 0).unwrap();
        assert_eq!(layout.view_line_count(), 10);
        for (i, seg) in layout.segments().iter().enumerate() {
            assert_eq!((seg.start_col, seg.end_col), (i * 50, i * 50 + 50));
        }
        assert!(cache.line(&ctx, 1).is_none());
    }

    #[test]
    fn test_update_view_cache_rows_follow_wrapped_lines() {
        let doc = TextDocument::from_text("aaaaaaaaaa\nbb\ncccccccc");
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(4);

        cache.update_view_cache(&ctx, DisplayPosition::new(0, 4), 6, 0);
        let rows: Vec<_> = cache
            .view_lines()
            .map(|l| l.map(|l| (l.line, l.start_col())))
            .collect();
        assert_eq!(
            rows,
            vec![
                Some((0, 4)),
                Some((0, 8)),
                Some((1, 0)),
                Some((2, 0)),
                Some((2, 4)),
                None
            ]
        );
        assert_eq!(cache.last_valid_view_line().unwrap().line, 2);
    }

    #[test]
    fn test_update_view_cache_mid_row_start_shows_containing_row() {
        let doc = TextDocument::from_text("aaaaaaaaaa\nbb");
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(4);

        cache.update_view_cache(&ctx, DisplayPosition::new(0, 6), 3, 0);
        let rows: Vec<_> = cache
            .view_lines()
            .map(|l| l.map(|l| (l.line, l.start_col())))
            .collect();
        assert_eq!(rows, vec![Some((0, 4)), Some((0, 8)), Some((1, 0))]);
    }

    #[test]
    fn test_fast_path_shift_keeps_moved_rows_clean() {
        let text: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
        let doc = TextDocument::from_text(&text.join("\n"));
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = LayoutCache::new();

        cache.update_view_cache(&ctx, DisplayPosition::new(0, 0), 10, 0);
        for row in 0..10 {
            cache.set_row_dirty(row, false);
        }
        cache.update_view_cache(&ctx, DisplayPosition::new(3, 0), 10, 3);

        let dirty: Vec<usize> = (0..10).filter(|r| cache.is_row_dirty(*r)).collect();
        assert_eq!(dirty, vec![7, 8, 9]);
        assert_eq!(cache.view_line(0).unwrap().line, 3);
    }

    #[test]
    fn test_display_view_line_counts_rows() {
        let doc = TextDocument::from_text("aaaaaaaaaa\nbb\ncccccccc\nd");
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(4);
        cache.update_view_cache(&ctx, DisplayPosition::new(1, 0), 3, 0);

        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(1, 0), true), Some(0));
        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(2, 5), true), Some(2));
        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(3, 0), true), None);
        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(3, 0), false), Some(3));
        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(0, 9), false), Some(-1));
        assert_eq!(cache.display_view_line(&ctx, DisplayPosition::new(0, 0), false), Some(-3));
    }

    #[test]
    fn test_folded_lines_are_skipped() {
        let doc = TextDocument::from_text("0\n1\n2\n3\n4\n5");
        let mut folding = FoldingManager::new(doc.line_count());
        folding.add_region(FoldRegion::collapsed(1, 3)).unwrap();
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = LayoutCache::new();

        cache.update_view_cache(&ctx, DisplayPosition::zero(), 4, 0);
        let lines: Vec<_> = cache.view_lines().map(|l| l.map(|l| l.line)).collect();
        assert_eq!(lines, vec![Some(0), Some(1), Some(4), Some(5)]);
        assert_eq!(cache.view_line(2).unwrap().display_line, 2);
    }

    #[test]
    fn test_edit_rekeys_layouts_below() {
        let mut doc = TextDocument::from_text("a\nb\nc\nd");
        let metrics = CellMetrics::unit();
        let mut cache = LayoutCache::new();
        {
            let folding = NoFolding::new(doc.line_count());
            let ctx = ViewContext::new(&doc, &folding, &metrics);
            cache.update_view_cache(&ctx, DisplayPosition::zero(), 4, 0);
        }
        let change = doc.split_line(Position::new(1, 1)).unwrap();
        cache.apply_text_change(&change);

        assert!(cache.is_line_cached(0));
        assert!(!cache.is_line_cached(1));
        assert!(cache.is_line_cached(3));
        assert!(cache.is_line_cached(4));

        let folding = NoFolding::new(doc.line_count());
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        assert_eq!(cache.line(&ctx, 4).unwrap().text(), "d");
    }

    #[test]
    fn test_relayout_marks_only_cached_lines() {
        let doc = TextDocument::from_text("a\nb\nc");
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = LayoutCache::new();
        cache.line(&ctx, 1);

        cache.relayout_lines(0, 100);
        assert_eq!(cache.cached_line_count(), 1);
        assert!(cache.lines.get(&1).unwrap().is_layout_dirty());

        cache.set_accept_dirty_layouts(true);
        assert!(cache.line(&ctx, 1).unwrap().is_layout_dirty());
        cache.set_accept_dirty_layouts(false);
        assert!(!cache.line(&ctx, 1).unwrap().is_layout_dirty());
    }

    #[test]
    fn test_non_positive_width_is_unbounded() {
        let doc = TextDocument::from_text(&"y".repeat(120));
        let folding = NoFolding::new(1);
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(-5);
        assert_eq!(cache.view_line_count(&ctx, 0), 1);
        cache.set_view_width(0);
        assert_eq!(cache.view_line_count(&ctx, 0), 1);
        cache.set_view_width(60);
        assert_eq!(cache.view_line_count(&ctx, 0), 2);
    }

    #[test]
    fn test_row_x_round_trip() {
        let doc = TextDocument::from_text("abcdefghij");
        let folding = NoFolding::new(1);
        let metrics = CellMetrics::new(10, 20);
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = wrapped_cache(40);
        let layout = cache.line(&ctx, 0).unwrap().clone();

        assert_eq!(layout.view_line_for_column(4), 1);
        assert_eq!(layout.column_to_row_x(&metrics, 6), 20);
        assert_eq!(layout.row_x_to_column(&metrics, 1, 20, false), 6);
        // Wrapping rows clamp before the wrap point.
        assert_eq!(layout.row_x_to_column(&metrics, 0, 500, false), 3);
        assert_eq!(layout.row_x_to_column(&metrics, 2, 500, false), 10);
        assert_eq!(layout.row_x_to_column(&metrics, 2, 500, true), 58);
    }
}
