//! Dirty-region / repaint tracking.
//!
//! Per-row dirty flags live on the rows of the [`LayoutCache`]; the tracker adds the pending
//! full repaint and the pending blit distance, and turns dirty rows into rectangles. Runs of
//! consecutive dirty rows coalesce into a single rectangle each.

use std::ops::Range;

use crate::context::ViewContext;
use crate::coords;
use crate::layout_cache::LayoutCache;
use crate::position::{DisplayPosition, Position};
use crate::scroll::ScrollOutcome;

/// A viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaintRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// Everything the host must do to bring the screen up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repaint {
    /// Repaint the whole viewport.
    pub full: bool,
    /// Blit the viewport by this many rows first (positive = content moves up).
    pub scroll_rows: isize,
    /// Dirty row runs.
    pub rows: Vec<Range<usize>>,
    /// One rectangle per dirty row run.
    pub rects: Vec<RepaintRect>,
}

impl Repaint {
    /// `true` if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        !self.full && self.scroll_rows == 0 && self.rects.is_empty()
    }
}

/// Receiver of repaint requests.
pub trait RepaintSink {
    /// Move the viewport contents up by `dy` pixels (down when negative).
    fn scroll_by(&mut self, dy: i64);

    /// Repaint everything.
    fn repaint_all(&mut self);

    /// Repaint one rectangle.
    fn repaint_rect(&mut self, rect: RepaintRect);
}

/// Pending repaint state.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    full: bool,
    scroll_rows: isize,
}

impl DirtyTracker {
    /// Nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a full repaint is pending.
    pub fn full_repaint_pending(&self) -> bool {
        self.full
    }

    /// Request a full repaint.
    pub fn request_full(&mut self) {
        self.full = true;
        self.scroll_rows = 0;
    }

    /// Record what a scroll request did.
    pub fn record(&mut self, outcome: ScrollOutcome) {
        match outcome {
            ScrollOutcome::Unchanged => {}
            ScrollOutcome::Scrolled { rows } if !self.full => self.scroll_rows += rows,
            ScrollOutcome::Scrolled { .. } => {}
            ScrollOutcome::Relayout => self.request_full(),
        }
    }

    /// Mark the row showing `pos` and the row after it dirty.
    ///
    /// Returns `false` if `pos` is not on screen.
    pub fn tag_line(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        pos: DisplayPosition,
    ) -> bool {
        if pos.line >= ctx.display_line_count() {
            return false;
        }
        let Some(row) = cache.display_view_line(ctx, pos, true) else {
            return false;
        };
        let row = row as usize;
        cache.set_row_dirty(row, true);
        // Glyphs such as underscores may overhang into the next row.
        if row + 1 < cache.row_count() {
            cache.set_row_dirty(row + 1, true);
        }
        true
    }

    /// Relayout display lines `start.line..=end.line`, rebuild the rows and mark the rows
    /// intersecting `start..=end` dirty.
    ///
    /// Returns `true` if any row on screen was tagged.
    pub fn tag_lines(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        start: DisplayPosition,
        end: DisplayPosition,
    ) -> bool {
        let first = coords::to_real(ctx.folding, start).line;
        let last = coords::to_real(ctx.folding, end).line;
        cache.relayout_lines(first, last);
        self.tag_rows(cache, ctx, start, end)
    }

    /// [`tag_lines`](Self::tag_lines) for real positions.
    pub fn tag_real_lines(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        start: Position,
        end: Position,
    ) -> bool {
        cache.relayout_lines(start.line, end.line);
        let start = coords::to_display(ctx.folding, start);
        let end = coords::to_display(ctx.folding, end);
        self.tag_rows(cache, ctx, start, end)
    }

    fn tag_rows(
        &mut self,
        cache: &mut LayoutCache,
        ctx: &ViewContext<'_>,
        start: DisplayPosition,
        end: DisplayPosition,
    ) -> bool {
        let view_start = cache.view_cache_start();
        let rows = cache.row_count();
        if end.line < view_start.line || start.line > view_start.line + rows {
            return false;
        }
        cache.update_view_cache(ctx, view_start, rows, 0);

        let mut tagged = false;
        for row in 0..rows {
            let Some(line) = cache.view_line(row) else {
                continue;
            };
            let after_start = line.display_line > start.line
                || (line.display_line == start.line && line.end_col() >= start.column);
            let before_end = line.display_line < end.line
                || (line.display_line == end.line && line.start_col() <= end.column);
            if after_start && before_end {
                cache.set_row_dirty(row, true);
                tagged = true;
            }
        }
        tagged
    }

    /// Drop every layout and request a full repaint.
    pub fn tag_all(&mut self, cache: &mut LayoutCache) {
        cache.clear();
        self.request_full();
    }

    /// Collect the pending repaint and reset the tracker and the row flags.
    pub fn take_repaint(&mut self, cache: &mut LayoutCache, line_height: u32, width: u32) -> Repaint {
        let count = cache.row_count();
        let mut rows = Vec::new();
        let mut run: Option<usize> = None;
        for row in 0..count {
            if cache.is_row_dirty(row) {
                run.get_or_insert(row);
            } else if let Some(start) = run.take() {
                rows.push(start..row);
            }
        }
        if let Some(start) = run {
            rows.push(start..count);
        }
        for row in 0..count {
            cache.set_row_dirty(row, false);
        }

        let full = std::mem::take(&mut self.full);
        let scroll_rows = std::mem::take(&mut self.scroll_rows);
        if full {
            return Repaint {
                full,
                scroll_rows: 0,
                rows: vec![0..count],
                rects: vec![RepaintRect {
                    x: 0,
                    y: 0,
                    width,
                    height: line_height.saturating_mul(count as u32),
                }],
            };
        }

        let rects = rows
            .iter()
            .map(|run| RepaintRect {
                x: 0,
                y: line_height.saturating_mul(run.start as u32),
                width,
                height: line_height.saturating_mul(run.len() as u32),
            })
            .collect();
        tracing::trace!(?rows, scroll_rows, "repaint collected");
        Repaint {
            full,
            scroll_rows,
            rows,
            rects,
        }
    }

    /// Collect the pending repaint and deliver it to `sink`. Returns `false` if there was
    /// nothing to do.
    pub fn flush(
        &mut self,
        cache: &mut LayoutCache,
        line_height: u32,
        width: u32,
        sink: &mut dyn RepaintSink,
    ) -> bool {
        let repaint = self.take_repaint(cache, line_height, width);
        if repaint.is_empty() {
            return false;
        }
        if repaint.full {
            sink.repaint_all();
            return true;
        }
        if repaint.scroll_rows != 0 {
            sink.scroll_by(repaint.scroll_rows as i64 * i64::from(line_height));
        }
        for rect in repaint.rects {
            sink.repaint_rect(rect);
        }
        true
    }
}
