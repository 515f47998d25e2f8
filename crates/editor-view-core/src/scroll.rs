//! Scroll/viewport controller.
//!
//! # Overview
//!
//! The controller owns the scroll position (a [`DisplayPosition`] at the top-left of the view,
//! plus a horizontal pixel offset when wrapping is off) and the viewport geometry. It moves the
//! position in *view-line* steps, so a wrapped line scrolls row by row, and rebuilds the rows of
//! the [`LayoutCache`] after each move.
//!
//! Small moves take a fast path: the cache is told how many rows the content moved, keeps the
//! rows that only shifted, and the host is asked to blit the viewport by
//! `rows * line_height` pixels ([`ScrollOutcome::Scrolled`]). Anything else rebuilds all rows
//! and asks for a full repaint ([`ScrollOutcome::Relayout`]).
//!
//! Row arithmetic:
//!
//! - rows displayed: `max(1, height / line_height)`
//! - caret margin (`min_lines_visible`): `min((rows - 1) / 2, auto_center_lines)`
//! - maximum start: the document end moved back by `rows - 1` rows, or by the caret margin
//!   when scroll-past-end is enabled.

use crate::config::ViewSettings;
use crate::context::ViewContext;
use crate::coords;
use crate::layout_cache::LayoutCache;
use crate::position::DisplayPosition;

/// Horizontal margin kept between the caret and the view edge, in pixels.
pub const HORIZONTAL_MARGIN_PX: u32 = 8;

/// What a scroll request did to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// Nothing moved.
    Unchanged,
    /// Content moved by `rows` view lines (positive = towards the end); blit and repaint the
    /// exposed rows.
    Scrolled {
        /// Rows scrolled.
        rows: isize,
    },
    /// Rows were rebuilt; repaint everything.
    Relayout,
}

impl ScrollOutcome {
    /// `true` unless nothing moved.
    pub fn moved(self) -> bool {
        !matches!(self, ScrollOutcome::Unchanged)
    }
}

/// Line scrollbar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollbarState {
    /// Largest start line reachable.
    pub maximum: usize,
    /// Current start line.
    pub value: usize,
    /// Lines per page.
    pub page_step: usize,
}

/// Scroll position and viewport geometry.
#[derive(Debug, Clone)]
pub struct ScrollController {
    start: DisplayPosition,
    start_x: u32,
    width: u32,
    height: u32,
    auto_center_lines: usize,
    scroll_past_end: bool,
    wrap_cursor: bool,
    cached_max_start: Option<DisplayPosition>,
    overlay_active: bool,
}

impl ScrollController {
    /// A controller scrolled to the top of a zero-sized viewport.
    pub fn new() -> Self {
        Self {
            start: DisplayPosition::zero(),
            start_x: 0,
            width: 0,
            height: 0,
            auto_center_lines: 0,
            scroll_past_end: false,
            wrap_cursor: true,
            cached_max_start: None,
            overlay_active: false,
        }
    }

    /// Adopt the scroll-related settings.
    pub fn apply_settings(&mut self, settings: &ViewSettings) {
        if self.scroll_past_end != settings.scroll_past_end
            || self.auto_center_lines != settings.auto_center_lines
        {
            self.cached_max_start = None;
        }
        self.auto_center_lines = settings.auto_center_lines;
        self.scroll_past_end = settings.scroll_past_end;
        self.wrap_cursor = settings.wrap_cursor;
    }

    /// Display position shown at the top-left of the view.
    pub fn start_pos(&self) -> DisplayPosition {
        self.start
    }

    /// Horizontal scroll offset in pixels.
    pub fn start_x(&self) -> u32 {
        self.start_x
    }

    /// Viewport width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Viewport height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Mark a floating overlay as shown; while set, scrolls repaint fully.
    pub fn set_overlay_active(&mut self, active: bool) {
        self.overlay_active = active;
    }

    /// Requested caret margin.
    pub fn set_auto_center_lines(&mut self, lines: usize) {
        if self.auto_center_lines != lines {
            self.auto_center_lines = lines;
            self.cached_max_start = None;
        }
    }

    /// Forget the cached maximum start position.
    pub fn invalidate_max_start(&mut self) {
        self.cached_max_start = None;
    }

    /// Whole rows that fit in the viewport (at least 1).
    pub fn lines_displayed(&self, ctx: &ViewContext<'_>) -> usize {
        let line_height = ctx.renderer.line_height().max(1);
        ((self.height / line_height) as usize).max(1)
    }

    /// Rows held by the view cache: the displayed rows plus one partially visible row.
    pub fn cache_rows(&self, ctx: &ViewContext<'_>) -> usize {
        let line_height = ctx.renderer.line_height().max(1);
        (self.height / line_height) as usize + 1
    }

    /// Caret margin in rows.
    pub fn min_lines_visible(&self, ctx: &ViewContext<'_>) -> usize {
        ((self.lines_displayed(ctx) - 1) / 2).min(self.auto_center_lines)
    }

    /// Move the start position without rebuilding rows.
    ///
    /// Used when the rows are rebuilt by the caller right after (edits, fold changes).
    pub fn set_start_unchecked(&mut self, start: DisplayPosition) {
        self.start = start;
    }

    /// Largest start position: the document end stays on screen.
    pub fn max_start_pos(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> DisplayPosition {
        if let Some(pos) = self.cached_max_start {
            return pos;
        }
        let end = ctx.display_end();
        let back = if self.scroll_past_end {
            self.min_lines_visible(ctx)
        } else {
            self.lines_displayed(ctx) - 1
        };
        let pos = self.view_line_offset(cache, ctx, end, -(back as isize), None);
        tracing::trace!(%pos, "max start position");
        self.cached_max_start = Some(pos);
        pos
    }

    /// Display position `delta` view lines away from `c`.
    ///
    /// The result starts a row, unless `preserve_x` is given: then the column under that
    /// row-relative x is returned. Walking past either end of the document clamps to the
    /// document end or start.
    pub fn view_line_offset(
        &self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        c: DisplayPosition,
        delta: isize,
        preserve_x: Option<u32>,
    ) -> DisplayPosition {
        let allow_virtual = !self.wrap_cursor;
        let last_display = ctx.last_display_line();

        if !cache.wrap() {
            let line = (c.line as isize + delta).clamp(0, last_display as isize) as usize;
            let mut ret = DisplayPosition::new(line, 0);
            if let Some(x) = preserve_x {
                let real = ctx.folding.visible_line_to_line(line);
                if let Some(layout) = cache.line(ctx, real) {
                    ret.column = layout.row_x_to_column(ctx.renderer, 0, x, allow_virtual);
                }
            }
            return ret;
        }

        let c_line = c.line.min(last_display);
        let real = coords::to_real(ctx.folding, DisplayPosition::new(c_line, c.column));
        let cursor_view_line = cache.view_line_for_column(ctx, real);
        let forwards = delta > 0;
        let want = delta.unsigned_abs();

        let same_line_target = if forwards {
            let room = cache.last_view_line(ctx, real.line) - cursor_view_line;
            (want <= room).then(|| cursor_view_line + want)
        } else {
            (want <= cursor_view_line).then(|| cursor_view_line - want)
        };
        if let Some(target) = same_line_target {
            return Self::row_position(cache, ctx, real.line, c_line, target, preserve_x, allow_virtual);
        }

        let mut walked = if forwards {
            cache.last_view_line(ctx, real.line) - cursor_view_line
        } else {
            cursor_view_line
        } + 1;
        let mut display = if forwards {
            Some(c_line + 1)
        } else {
            c_line.checked_sub(1)
        };
        while let Some(d) = display.filter(|d| *d <= last_display) {
            let line = ctx.folding.visible_line_to_line(d);
            let count = cache.view_line_count(ctx, line);
            if want < walked + count {
                let step = want - walked;
                let index = if forwards { step } else { count - 1 - step };
                return Self::row_position(cache, ctx, line, d, index, preserve_x, allow_virtual);
            }
            walked += count;
            display = if forwards { Some(d + 1) } else { d.checked_sub(1) };
        }

        if forwards {
            ctx.display_end()
        } else {
            DisplayPosition::zero()
        }
    }

    fn row_position(
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        line: usize,
        display: usize,
        index: usize,
        preserve_x: Option<u32>,
        allow_virtual: bool,
    ) -> DisplayPosition {
        let Some(layout) = cache.line(ctx, line) else {
            return DisplayPosition::new(display, 0);
        };
        let column = match preserve_x {
            Some(x) => layout.row_x_to_column(ctx.renderer, index, x, allow_virtual),
            None => layout
                .segments()
                .get(index)
                .map_or(0, |s| s.start_col),
        };
        DisplayPosition::new(display, column)
    }

    /// Scroll so that the row holding `target` is at the top of the view.
    ///
    /// The target is moved back to its row start, then clamped to `[0, max_start_pos]`. Unless `force` is set, requests for the
    /// current position are ignored. External calls (from a scrollbar, an API) always rebuild
    /// and repaint fully.
    pub fn scroll_to(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        target: DisplayPosition,
        force: bool,
        called_externally: bool,
    ) -> ScrollOutcome {
        let target = Self::row_start(cache, ctx, target);
        let wrap = cache.wrap();
        let is_current =
            |c: DisplayPosition, start: DisplayPosition| (!wrap && c.line == start.line) || c == start;
        if !force && is_current(target, self.start) {
            return ScrollOutcome::Unchanged;
        }

        let mut c = target;
        let limit = self.max_start_pos(cache, ctx);
        if c > limit {
            c = limit;
            if !force && is_current(c, self.start) {
                return ScrollOutcome::Unchanged;
            }
        }

        let lines = self.lines_displayed(ctx);
        let end_line = cache
            .last_valid_view_line()
            .map_or(self.start.line, |l| l.display_line);
        let hint_usable = !force
            && c.line as isize >= self.start.line as isize - lines as isize - 1
            && c.line <= end_line + lines + 1;
        let scrolled = if hint_usable {
            cache.display_view_line(ctx, c, false).unwrap_or(0)
        } else {
            0
        };

        self.start = c;

        if hint_usable {
            let mut visible_rows = lines;
            let display_lines = ctx.display_line_count();
            if display_lines < lines {
                let end = ctx.display_end();
                let rows_to_end = cache.display_view_line(ctx, end, false).unwrap_or(0) + 1;
                visible_rows = lines.min(rows_to_end.max(0) as usize);
            }
            if !called_externally
                && scrolled.unsigned_abs() < visible_rows
                && !self.overlay_active
            {
                self.update_view(cache, ctx, false, scrolled);
                tracing::debug!(start = %self.start, rows = scrolled, "scrolled (fast path)");
                return ScrollOutcome::Scrolled { rows: scrolled };
            }
        }

        self.update_view(cache, ctx, false, 0);
        tracing::debug!(start = %self.start, "scrolled (relayout)");
        ScrollOutcome::Relayout
    }

    /// Rebuild the view cache rows from the current start position.
    ///
    /// `changed` drops the cached maximum start position (document, folding or layout
    /// changed).
    pub fn update_view(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        changed: bool,
        scrolled: isize,
    ) {
        if changed {
            self.cached_max_start = None;
        }
        let rows = self.cache_rows(ctx);
        cache.update_view_cache(ctx, self.start, rows, scrolled);

        if cache.wrap() {
            self.start_x = 0;
        } else {
            self.start_x = self.start_x.min(self.max_start_x(cache, ctx));
        }
    }

    /// Largest horizontal offset for the rows on screen (0 when wrapping).
    pub fn max_start_x(&self, cache: &LayoutCache, ctx: &ViewContext<'_>) -> u32 {
        if cache.wrap() {
            return 0;
        }
        let widest = cache.max_row_width();
        if widest <= self.width {
            return 0;
        }
        // Room for the caret at the end of the longest line.
        widest - self.width + ctx.renderer.space_width() / 2
    }

    /// Set the horizontal offset, clamped. Returns `true` if it changed.
    pub fn scroll_columns(&mut self, cache: &LayoutCache, ctx: &ViewContext<'_>, x: u32) -> bool {
        let x = x.min(self.max_start_x(cache, ctx));
        if x == self.start_x {
            return false;
        }
        tracing::debug!(from = self.start_x, to = x, "horizontal scroll");
        self.start_x = x;
        true
    }

    /// Scroll so that display line `line` is at the top.
    pub fn scroll_lines(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        line: usize,
    ) -> ScrollOutcome {
        self.scroll_to(cache, ctx, DisplayPosition::new(line, 0), false, false)
    }

    /// Scroll by `delta` view lines.
    pub fn scroll_view_lines(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        delta: isize,
    ) -> ScrollOutcome {
        let c = self.view_line_offset(cache, ctx, self.start, delta, None);
        self.scroll_to(cache, ctx, c, false, false)
    }

    /// Scroll one row down.
    pub fn scroll_next_line(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> ScrollOutcome {
        self.scroll_view_lines(cache, ctx, 1)
    }

    /// Scroll one row up.
    pub fn scroll_prev_line(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> ScrollOutcome {
        self.scroll_view_lines(cache, ctx, -1)
    }

    /// Scroll one page down, keeping one row of overlap.
    pub fn scroll_next_page(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let page = self.lines_displayed(ctx).saturating_sub(1);
        self.scroll_view_lines(cache, ctx, page as isize)
    }

    /// Scroll one page up, keeping one row of overlap.
    pub fn scroll_prev_page(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let page = self.lines_displayed(ctx).saturating_sub(1);
        self.scroll_view_lines(cache, ctx, -(page as isize))
    }

    /// Rows a page up/down moves, respecting the caret margin.
    pub fn page_rows(&self, ctx: &ViewContext<'_>, half: bool) -> usize {
        let rows = self.lines_displayed(ctx);
        let base = if half { rows / 2 } else { rows };
        base.saturating_sub(1)
            .saturating_sub(self.min_lines_visible(ctx))
    }

    /// Scroll so that `c` is inside the view, honouring the caret margin.
    ///
    /// - `force`: scroll so that `c` is the start position.
    /// - `center`: when `c` is off-screen, put it in the middle row.
    ///
    /// With wrapping off, also scrolls horizontally to keep the caret column visible.
    pub fn make_visible(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        c: DisplayPosition,
        force: bool,
        center: bool,
        called_externally: bool,
    ) -> ScrollOutcome {
        let lines = self.lines_displayed(ctx);
        let margin = self.min_lines_visible(ctx);

        let outcome = if force {
            self.scroll_to(cache, ctx, c, true, called_externally)
        } else if center && (c < self.start || self.end_pos(cache, ctx).is_none_or(|end| c > end)) {
            let target = self.view_line_offset(cache, ctx, c, -((lines / 2) as isize), None);
            self.scroll_to(cache, ctx, target, false, called_externally)
        } else {
            let bottom_rows = lines.saturating_sub(margin + 1);
            let bottom = self.view_line_offset(cache, ctx, self.start, bottom_rows as isize, None);
            let top = self.view_line_offset(cache, ctx, self.start, margin as isize, None);
            if c > bottom {
                let target = self.view_line_offset(cache, ctx, c, -(bottom_rows as isize), None);
                self.scroll_to(cache, ctx, target, false, called_externally)
            } else if c < top {
                let target = self.view_line_offset(cache, ctx, c, -(margin as isize), None);
                self.scroll_to(cache, ctx, target, false, called_externally)
            } else {
                let max = self.max_start_pos(cache, ctx);
                if self.start > max {
                    self.scroll_to(cache, ctx, max, false, called_externally)
                } else {
                    ScrollOutcome::Unchanged
                }
            }
        };

        if !cache.wrap() {
            self.keep_column_visible(cache, ctx, c);
        }
        outcome
    }

    /// `pos` moved back to the start of the row holding it.
    fn row_start(
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        pos: DisplayPosition,
    ) -> DisplayPosition {
        if !cache.wrap() || pos.column == 0 {
            return pos;
        }
        let real = coords::to_real(ctx.folding, pos);
        cache
            .text_layout_at(ctx, real)
            .map_or(pos, |row| pos.with_column(row.start_col()))
    }

    fn keep_column_visible(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>, c: DisplayPosition) {
        let real = coords::to_real(ctx.folding, c);
        let Some(x) = cache
            .line(ctx, real.line)
            .map(|layout| ctx.renderer.column_to_x(layout.text(), real.column))
        else {
            return;
        };
        if x < self.start_x {
            self.scroll_columns(cache, ctx, x.saturating_sub(HORIZONTAL_MARGIN_PX));
        } else if x > self.start_x + self.width {
            self.scroll_columns(
                cache,
                ctx,
                (x + HORIZONTAL_MARGIN_PX).saturating_sub(self.width),
            );
        }
    }

    /// Last display position visible in the view, or `None` before the first layout.
    pub fn end_pos(&self, cache: &LayoutCache, ctx: &ViewContext<'_>) -> Option<DisplayPosition> {
        let shown = self.lines_displayed(ctx).min(cache.row_count());
        let row = (0..shown).rev().find_map(|row| cache.view_line(row))?;
        if row.display_line >= ctx.display_line_count() {
            return Some(ctx.display_end());
        }
        Some(row.end())
    }

    /// Display position of the top-most caret row allowed by the caret margin.
    pub fn top_of_view(&self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> DisplayPosition {
        let margin = self.min_lines_visible(ctx);
        self.view_line_offset(cache, ctx, self.start, margin as isize, None)
    }

    /// Display position of the bottom-most caret row allowed by the caret margin.
    pub fn bottom_of_view(&self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> DisplayPosition {
        let rows = self.lines_displayed(ctx) as isize;
        let last = self.view_line_offset(cache, ctx, self.start, rows - 1, None);
        let margin = self.min_lines_visible(ctx) as isize;
        self.view_line_offset(cache, ctx, last, -margin, None)
    }

    /// Line scrollbar state.
    pub fn scrollbar(&mut self, cache: &mut LayoutCache, ctx: &ViewContext<'_>) -> ScrollbarState {
        let max = self.max_start_pos(cache, ctx);
        let maximum = if cache.wrap() && max.column != 0 {
            max.line + 1
        } else {
            max.line
        };
        ScrollbarState {
            maximum,
            value: self.start.line,
            page_step: self.lines_displayed(ctx),
        }
    }

    /// Apply new viewport geometry. Negative sizes are treated as zero.
    ///
    /// Rebuilds the rows when needed and pulls the start position back if growing the view
    /// moved the maximum start above it.
    pub fn resize(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        width: i32,
        height: i32,
    ) -> ScrollOutcome {
        let width = width.max(0) as u32;
        let height = height.max(0) as u32;
        let old_width = self.width;
        let old_height = self.height;
        self.width = width;
        self.height = height;

        let height_changed = height != old_height;
        let expanded_horizontally = width > old_width;
        let expanded_vertically = height > old_height;
        if height_changed {
            self.cached_max_start = None;
        }

        if cache.wrap() {
            // Layouts were dropped by the width change if it affected wrapping.
            let needs_update = height_changed
                || width != old_width
                || cache.view_lines().flatten().any(|l| l.wraps() || l.segment.extent() > width);
            if needs_update {
                self.update_view(cache, ctx, true, 0);
            }
        } else {
            self.update_view(cache, ctx, false, 0);
            if expanded_horizontally && self.start_x > 0 {
                let shrink = width - old_width;
                self.scroll_columns(cache, ctx, self.start_x.saturating_sub(shrink));
            }
        }

        if expanded_vertically {
            let max = self.max_start_pos(cache, ctx);
            if self.start > max {
                return self.scroll_to(cache, ctx, max, false, false);
            }
        }
        ScrollOutcome::Relayout
    }
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, TextDocument};
    use crate::folding::NoFolding;
    use crate::layout::WrapMode;
    use crate::metrics::CellMetrics;

    fn numbered(lines: usize) -> TextDocument {
        let text: Vec<String> = (0..lines).map(|i| format!("line {i}")).collect();
        TextDocument::from_text(&text.join("\n"))
    }

    fn setup(
        ctx: &ViewContext<'_>,
        rows: i32,
        wrap_width: Option<i32>,
    ) -> (ScrollController, LayoutCache) {
        let mut cache = LayoutCache::new();
        if let Some(w) = wrap_width {
            cache.set_wrap(true);
            cache.set_wrap_mode(WrapMode::Char);
            cache.set_view_width(w);
        }
        let mut scroll = ScrollController::new();
        let line_height = ctx.renderer.line_height() as i32;
        scroll.resize(&mut cache, ctx, wrap_width.unwrap_or(80), rows * line_height);
        (scroll, cache)
    }

    #[test]
    fn test_max_start_pins_last_line_to_bottom() {
        let doc = numbered(100);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::new(8, 16);
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 20, None);

        assert_eq!(scroll.lines_displayed(&ctx), 20);
        assert_eq!(
            scroll.max_start_pos(&mut cache, &ctx),
            DisplayPosition::new(80, 0)
        );
        scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(95, 0), false, false);
        assert_eq!(scroll.start_pos(), DisplayPosition::new(80, 0));
    }

    #[test]
    fn test_scroll_past_end_uses_caret_margin() {
        let doc = numbered(100);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 20, None);
        scroll.apply_settings(&ViewSettings {
            scroll_past_end: true,
            auto_center_lines: 3,
            ..ViewSettings::default()
        });
        assert_eq!(scroll.min_lines_visible(&ctx), 3);
        assert_eq!(
            scroll.max_start_pos(&mut cache, &ctx),
            DisplayPosition::new(96, 0)
        );
    }

    #[test]
    fn test_small_scroll_takes_fast_path() {
        let doc = numbered(100);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 20, None);

        let outcome = scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(5, 0), false, false);
        assert_eq!(outcome, ScrollOutcome::Scrolled { rows: 5 });
        assert_eq!(cache.view_line(0).unwrap().line, 5);

        let outcome = scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(60, 0), false, false);
        assert_eq!(outcome, ScrollOutcome::Relayout);

        let outcome = scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(58, 0), false, true);
        assert_eq!(outcome, ScrollOutcome::Relayout);

        scroll.set_overlay_active(true);
        let outcome = scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(59, 0), false, false);
        assert_eq!(outcome, ScrollOutcome::Relayout);

        let outcome = scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(59, 0), false, false);
        assert_eq!(outcome, ScrollOutcome::Unchanged);
    }

    #[test]
    fn test_view_line_offset_walks_wrapped_rows() {
        // Line 0 wraps into 3 rows, line 1 into 1, line 2 into 2.
        let doc = TextDocument::from_text("aaaaaaaaaa\nbb\ncccccccc");
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (scroll, mut cache) = setup(&ctx, 3, Some(4));

        let at = |l, c| DisplayPosition::new(l, c);
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 0), 1, None), at(0, 4));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 4), 2, None), at(1, 0));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 0), 4, None), at(2, 0));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 0), 5, None), at(2, 4));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(2, 4), -2, None), at(1, 0));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(2, 0), -2, None), at(0, 8));
        // Off either end clamps.
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(2, 0), 5, None), at(2, 8));
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(1, 0), -9, None), at(0, 0));
        // Offset 0 snaps to the row start.
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 6), 0, None), at(0, 4));
        // Preserved x picks the column under it.
        assert_eq!(scroll.view_line_offset(&mut cache, &ctx, at(0, 0), 1, Some(2)), at(0, 6));
    }

    #[test]
    fn test_make_visible_respects_margin() {
        let doc = numbered(200);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 20, None);
        scroll.set_auto_center_lines(3);

        scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(50, 0), false, false, false);
        assert_eq!(scroll.start_pos(), DisplayPosition::new(34, 0));

        scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(35, 0), false, false, false);
        assert_eq!(scroll.start_pos(), DisplayPosition::new(32, 0));

        let outcome =
            scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(40, 0), false, false, false);
        assert_eq!(outcome, ScrollOutcome::Unchanged);

        scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(150, 0), false, true, false);
        assert_eq!(scroll.start_pos(), DisplayPosition::new(140, 0));
    }

    #[test]
    fn test_horizontal_scroll_follows_caret() {
        let long = "x".repeat(300);
        let doc = TextDocument::from_text(&long);
        let folding = NoFolding::new(1);
        let metrics = CellMetrics::new(1, 1);
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 5, None);
        assert_eq!(scroll.width(), 80);

        scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(0, 200), false, false, false);
        assert_eq!(scroll.start_x(), 200 + HORIZONTAL_MARGIN_PX - 80);

        scroll.make_visible(&mut cache, &ctx, DisplayPosition::new(0, 10), false, false, false);
        assert_eq!(scroll.start_x(), 2);

        assert!(scroll.scroll_columns(&cache, &ctx, 10_000));
        assert_eq!(scroll.start_x(), 220);
    }

    #[test]
    fn test_resize_pulls_start_back() {
        let doc = numbered(30);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let (mut scroll, mut cache) = setup(&ctx, 10, None);
        scroll.scroll_to(&mut cache, &ctx, DisplayPosition::new(20, 0), false, false);
        assert_eq!(scroll.start_pos().line, 20);

        scroll.resize(&mut cache, &ctx, 80, 20);
        assert_eq!(scroll.start_pos().line, 10);
        assert_eq!(
            scroll.scrollbar(&mut cache, &ctx),
            ScrollbarState {
                maximum: 10,
                value: 10,
                page_step: 20
            }
        );
    }

    #[test]
    fn test_degenerate_geometry() {
        let doc = numbered(10);
        let folding = NoFolding::new(doc.line_count());
        let metrics = CellMetrics::unit();
        let ctx = ViewContext::new(&doc, &folding, &metrics);
        let mut cache = LayoutCache::new();
        let mut scroll = ScrollController::new();
        scroll.resize(&mut cache, &ctx, -10, -3);
        assert_eq!(scroll.lines_displayed(&ctx), 1);
        assert_eq!(scroll.height(), 0);
        assert_eq!(cache.row_count(), 1);
    }
}
