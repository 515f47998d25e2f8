//! The view facade.
//!
//! A [`View`] owns everything that is private to one view of a document: the resolved
//! configuration, the layout cache, the scroll controller, the carets, the drag state, the
//! dirty tracker and the event subscribers. The document, the folding and the renderer are
//! shared and are passed in with every call as a [`ViewContext`].
//!
//! Edits reach the view either directly through [`View::apply_text_change`], or through the
//! callback returned by [`View::change_sink`], which queues changes until
//! [`View::process_pending_changes`] runs. Either way each change is applied to the cache
//! before the rows are rebuilt.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::Rc;

use crate::config::{ConfigKey, ConfigValue, GlobalConfig, ViewConfig, ViewSettings};
use crate::context::ViewContext;
use crate::coords;
use crate::cursors::{self, Motion, MoveOptions, MultiCursor};
use crate::dirty::{DirtyTracker, Repaint, RepaintSink};
use crate::document::TextChange;
use crate::error::ConfigError;
use crate::layout::WrapMode;
use crate::layout_cache::LayoutCache;
use crate::position::{DisplayPosition, Position};
use crate::render_range::{Attribute, RenderRangeList, SelectionRenderRange, StyleId};
use crate::scroll::{ScrollController, ScrollOutcome, ScrollbarState};
use crate::selection::{
    self, DefaultWordClassifier, Selection, SelectionDrag, SelectionMode, WordClassifier,
};
use crate::subscription::{SubscriptionId, Subscribers};

/// Notifications sent to view subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The start position changed.
    VerticalScrollPositionChanged(DisplayPosition),
    /// The horizontal offset changed.
    HorizontalScrollPositionChanged(u32),
    /// The range of displayed lines changed.
    DisplayRangeChanged,
    /// Some selection changed.
    SelectionChanged,
    /// The primary cursor moved.
    CursorPositionChanged(Position),
}

struct CursorSnapshot {
    position: Position,
    selections: Vec<Selection>,
}

/// One view of a document.
pub struct View {
    config: ViewConfig,
    settings: ViewSettings,
    cache: LayoutCache,
    scroll: ScrollController,
    cursors: MultiCursor,
    drag: SelectionDrag,
    dirty: DirtyTracker,
    classifier: Box<dyn WordClassifier>,
    pending: Rc<RefCell<VecDeque<TextChange>>>,
    subscribers: Subscribers<ViewEvent>,
}

impl View {
    /// A view with `config`, scrolled to the top, sized 0x0 until [`resize`](Self::resize).
    pub fn new(config: ViewConfig) -> Self {
        let settings = config.resolve();
        let mut view = Self {
            config,
            settings,
            cache: LayoutCache::new(),
            scroll: ScrollController::new(),
            cursors: MultiCursor::new(),
            drag: SelectionDrag::new(),
            dirty: DirtyTracker::new(),
            classifier: Box::new(DefaultWordClassifier),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            subscribers: Subscribers::new(),
        };
        view.apply_settings();
        view
    }

    /// Replace the word classifier used by word selection and word motions.
    pub fn set_word_classifier(&mut self, classifier: Box<dyn WordClassifier>) {
        self.classifier = classifier;
    }

    /// Per-view configuration.
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Mutable per-view configuration; call [`config_changed`](Self::config_changed) after
    /// editing it.
    pub fn config_mut(&mut self) -> &mut ViewConfig {
        &mut self.config
    }

    /// Resolved settings in effect.
    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// The layout cache.
    pub fn layout_cache(&self) -> &LayoutCache {
        &self.cache
    }

    /// The scroll controller.
    pub fn scroll_controller(&self) -> &ScrollController {
        &self.scroll
    }

    /// The carets.
    pub fn cursors(&self) -> &MultiCursor {
        &self.cursors
    }

    /// The drag state machine.
    pub fn selection_drag(&self) -> &SelectionDrag {
        &self.drag
    }

    /// Subscribe to view events.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ViewEvent) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Detach a callback registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn move_options(&self) -> MoveOptions {
        MoveOptions {
            virtual_space: !self.settings.wrap_cursor,
            smart_home: self.settings.smart_home,
            persistent_selection: self.settings.persistent_selection,
        }
    }

    fn apply_settings(&mut self) {
        let s = &self.settings;
        self.cache
            .set_wrap(s.dyn_word_wrap && s.wrap_mode != WrapMode::None);
        self.cache.set_wrap_mode(s.wrap_mode);
        self.cache.set_wrap_indent(s.wrap_indent);
        self.scroll.apply_settings(s);
    }

    fn wrap_width(&self, ctx: &ViewContext<'_>, view_width: i32) -> i32 {
        if !self.settings.dyn_wrap_at_static_marker {
            return view_width;
        }
        let marker = (self.settings.word_wrap_at as u64)
            .saturating_mul(u64::from(ctx.renderer.space_width()));
        view_width.min(i32::try_from(marker).unwrap_or(i32::MAX))
    }

    fn current_view_width(&self) -> i32 {
        i32::try_from(self.scroll.width()).unwrap_or(i32::MAX)
    }

    // Events

    fn notify(&mut self, event: ViewEvent) {
        self.subscribers.notify(&event);
    }

    fn cursor_snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            position: self.cursors.position(),
            selections: self.cursors.selections(),
        }
    }

    fn scroll_snapshot(&self) -> (DisplayPosition, u32) {
        (self.scroll.start_pos(), self.scroll.start_x())
    }

    fn finish_scroll(&mut self, before: (DisplayPosition, u32)) {
        let (start, x) = before;
        if self.scroll.start_x() != x {
            self.dirty.request_full();
            self.notify(ViewEvent::HorizontalScrollPositionChanged(
                self.scroll.start_x(),
            ));
        }
        if self.scroll.start_pos() != start {
            self.notify(ViewEvent::VerticalScrollPositionChanged(
                self.scroll.start_pos(),
            ));
            self.notify(ViewEvent::DisplayRangeChanged);
        }
    }

    fn tag_selection(&mut self, ctx: &ViewContext<'_>, selection: Selection) {
        if selection.is_empty() {
            let pos = coords::to_display(ctx.folding, selection.active);
            self.dirty.tag_line(&mut self.cache, ctx, pos);
        } else {
            self.dirty
                .tag_real_lines(&mut self.cache, ctx, selection.start(), selection.end());
        }
    }

    fn cursor_changed(&mut self, ctx: &ViewContext<'_>, before: CursorSnapshot) {
        let after = self.cursor_snapshot();
        if after.selections != before.selections {
            for selection in before.selections.iter().chain(&after.selections) {
                self.tag_selection(ctx, *selection);
            }
            let ranges = |s: &[Selection]| -> Vec<Range<Position>> {
                s.iter().filter(|s| !s.is_empty()).map(Selection::range).collect()
            };
            if ranges(before.selections.as_slice()) != ranges(after.selections.as_slice()) {
                self.notify(ViewEvent::SelectionChanged);
            }
        }
        if after.position != before.position {
            self.notify(ViewEvent::CursorPositionChanged(after.position));
        }
    }

    fn make_cursor_visible(&mut self, ctx: &ViewContext<'_>) {
        let pos = coords::to_display(ctx.folding, self.cursors.position());
        let outcome = self
            .scroll
            .make_visible(&mut self.cache, ctx, pos, false, false, false);
        self.dirty.record(outcome);
    }

    fn after_cursor_move(
        &mut self,
        ctx: &ViewContext<'_>,
        before: CursorSnapshot,
        scroll_before: (DisplayPosition, u32),
    ) {
        self.make_cursor_visible(ctx);
        self.finish_scroll(scroll_before);
        self.cursor_changed(ctx, before);
    }

    fn clamp_to_max_start(&mut self, ctx: &ViewContext<'_>) {
        let max = self.scroll.max_start_pos(&mut self.cache, ctx);
        if self.scroll.start_pos() > max {
            let outcome = self.scroll.scroll_to(&mut self.cache, ctx, max, false, false);
            self.dirty.record(outcome);
        }
    }

    fn snap_start(&mut self, ctx: &ViewContext<'_>) {
        let start = self.scroll.start_pos();
        let column = if self.cache.wrap() {
            let real = coords::to_real(ctx.folding, start);
            self.cache
                .text_layout_at(ctx, real)
                .map_or(0, |row| row.start_col())
        } else {
            0
        };
        self.scroll.set_start_unchecked(start.with_column(column));
    }

    fn clamp_position(&self, ctx: &ViewContext<'_>, pos: Position) -> Position {
        if self.settings.wrap_cursor {
            return ctx.clamp(pos);
        }
        let line = pos.line.min(ctx.document.line_count().saturating_sub(1));
        Position::new(line, pos.column)
    }

    // Geometry and document notifications

    /// Apply a new viewport size in pixels. Negative sizes are treated as zero.
    pub fn resize(&mut self, ctx: &ViewContext<'_>, width: i32, height: i32) {
        let before = self.scroll_snapshot();
        let wrap_width = self.wrap_width(ctx, width);
        self.cache.set_view_width(wrap_width);
        let outcome = self.scroll.resize(&mut self.cache, ctx, width, height);
        tracing::debug!(width, height, ?outcome, "view resized");
        self.dirty.request_full();
        self.finish_scroll(before);
        self.notify(ViewEvent::DisplayRangeChanged);
    }

    /// Rebuild the rows; `changed` also drops the cached maximum start position.
    pub fn update_view(&mut self, ctx: &ViewContext<'_>, changed: bool) {
        self.scroll.update_view(&mut self.cache, ctx, changed, 0);
    }

    /// Bring the view up to date with one edit of the document.
    ///
    /// `ctx` must describe the document after the edit. The scroll position stays on the
    /// line it showed before the edit, carets move with the text, and the rows touched by
    /// the edit are tagged for repaint.
    pub fn apply_text_change(&mut self, ctx: &ViewContext<'_>, change: &TextChange) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();

        let start = self.scroll.start_pos();
        let top = self.cache.view_line(0).map_or_else(
            || coords::to_real(ctx.folding, start),
            |row| Position::new(row.line, start.column),
        );
        self.cache.apply_text_change(change);

        // An edit starting exactly at the top position (insert, remove or replace) leaves the
        // top line where it is; only the text below it changes.
        let top = if change.start == top {
            top
        } else {
            ctx.clamp(change.map_position(top))
        };
        self.scroll
            .set_start_unchecked(coords::to_display(ctx.folding, top));
        self.snap_start(ctx);

        if change.line_delta() != 0 && change.start.line < top.line {
            self.dirty.request_full();
        }
        self.scroll.update_view(&mut self.cache, ctx, true, 0);
        let end = if change.line_delta() != 0 {
            ctx.document.end_position()
        } else {
            change.new_end
        };
        self.dirty
            .tag_real_lines(&mut self.cache, ctx, change.start, end);

        self.cursors.apply_text_change(change);
        self.cursors
            .clamp(ctx.document, !self.settings.wrap_cursor);
        self.clamp_to_max_start(ctx);

        if self.cursors.position() != before.position {
            self.make_cursor_visible(ctx);
        }
        self.finish_scroll(scroll_before);
        self.cursor_changed(ctx, before);
    }

    /// A callback for [`TextDocument::subscribe`](crate::TextDocument::subscribe) that queues
    /// changes for [`process_pending_changes`](Self::process_pending_changes).
    pub fn change_sink(&self) -> impl FnMut(&TextChange) + 'static {
        let pending = Rc::clone(&self.pending);
        move |change: &TextChange| pending.borrow_mut().push_back(*change)
    }

    /// Apply every queued change in order. Returns how many were applied.
    pub fn process_pending_changes(&mut self, ctx: &ViewContext<'_>) -> usize {
        let changes: Vec<TextChange> = self.pending.borrow_mut().drain(..).collect();
        for change in &changes {
            self.apply_text_change(ctx, change);
        }
        changes.len()
    }

    /// Bring the view up to date after lines were folded or unfolded.
    ///
    /// The top row keeps showing the same real line when it is still visible. Carets on
    /// lines that became hidden move to the end of their fold's first line.
    pub fn folding_changed(&mut self, ctx: &ViewContext<'_>) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();

        let start = self.scroll.start_pos();
        let top = self.cache.view_line(0).map_or_else(
            || coords::to_real(ctx.folding, start),
            |row| row.real_start(),
        );
        self.cache.clear();
        let mut new_start = coords::to_display(ctx.folding, top);
        if !ctx.folding.is_line_visible(top.line) {
            new_start.column = 0;
        }
        self.scroll.set_start_unchecked(new_start);
        self.scroll.update_view(&mut self.cache, ctx, true, 0);
        self.clamp_to_max_start(ctx);
        tracing::debug!(start = %self.scroll.start_pos(), "folding changed");

        // Selections keep their anchor; plain carets stay plain.
        self.cursors.move_all(false, true, |caret| {
            let pos = caret.position();
            match ctx.folding.folded_range_containing(pos.line) {
                Some(range) if !ctx.folding.is_line_visible(pos.line) => {
                    let anchor = *range.start();
                    (
                        Position::new(anchor, ctx.document.line_length(anchor)),
                        None,
                    )
                }
                _ => (pos, caret.preferred_x),
            }
        });

        self.dirty.request_full();
        self.finish_scroll(scroll_before);
        self.notify(ViewEvent::DisplayRangeChanged);
        self.cursor_changed(ctx, before);
    }

    /// Re-read the configuration after [`config_mut`](Self::config_mut) edits.
    ///
    /// Returns `false` when nothing changed. Toggling soft wrap keeps the primary caret on
    /// the same screen row.
    pub fn config_changed(&mut self, ctx: &ViewContext<'_>) -> bool {
        let settings = self.config.resolve();
        let changed = self.settings.diff(&settings);
        if changed.is_empty() {
            return false;
        }
        tracing::debug!(?changed, "view settings changed");
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();

        let caret_row = if changed.contains(&ConfigKey::DynWordWrap) {
            let pos = coords::to_display(ctx.folding, self.cursors.position());
            self.cache.display_view_line(ctx, pos, true)
        } else {
            None
        };

        self.settings = settings;
        self.apply_settings();
        let wrap_width = self.wrap_width(ctx, self.current_view_width());
        self.cache.set_view_width(wrap_width);
        self.cursors
            .clamp(ctx.document, !self.settings.wrap_cursor);

        if changed.iter().any(|key| key.affects_layout()) {
            self.dirty.tag_all(&mut self.cache);
            self.snap_start(ctx);
            self.scroll.update_view(&mut self.cache, ctx, true, 0);
        } else {
            self.scroll.invalidate_max_start();
        }

        match caret_row {
            Some(row) => {
                let pos = coords::to_display(ctx.folding, self.cursors.position());
                let start =
                    self.scroll
                        .view_line_offset(&mut self.cache, ctx, pos, -row, None);
                let outcome = self
                    .scroll
                    .make_visible(&mut self.cache, ctx, start, true, false, false);
                self.dirty.record(outcome);
            }
            None => self.clamp_to_max_start(ctx),
        }

        self.finish_scroll(scroll_before);
        self.notify(ViewEvent::DisplayRangeChanged);
        self.cursor_changed(ctx, before);
        true
    }

    /// Set one local configuration value and apply it.
    pub fn set_config(
        &mut self,
        ctx: &ViewContext<'_>,
        key: ConfigKey,
        value: ConfigValue,
    ) -> Result<bool, ConfigError> {
        self.config.set(key, value)?;
        Ok(self.config_changed(ctx))
    }

    /// Adopt the current global configuration and apply it.
    pub fn rebase_config(&mut self, ctx: &ViewContext<'_>, global: &GlobalConfig) -> bool {
        self.config.rebase(global) && self.config_changed(ctx)
    }

    /// Turn soft wrapping on or off, keeping the primary caret on its screen row.
    pub fn set_dyn_word_wrap(
        &mut self,
        ctx: &ViewContext<'_>,
        enabled: bool,
    ) -> Result<bool, ConfigError> {
        self.set_config(ctx, ConfigKey::DynWordWrap, ConfigValue::Bool(enabled))
    }

    /// Drop every layout after a font or metrics change.
    pub fn renderer_changed(&mut self, ctx: &ViewContext<'_>) {
        let scroll_before = self.scroll_snapshot();
        let wrap_width = self.wrap_width(ctx, self.current_view_width());
        self.cache.set_view_width(wrap_width);
        self.dirty.tag_all(&mut self.cache);
        self.snap_start(ctx);
        self.scroll.update_view(&mut self.cache, ctx, true, 0);
        self.clamp_to_max_start(ctx);
        tracing::debug!("renderer changed, layouts dropped");
        self.finish_scroll(scroll_before);
        self.notify(ViewEvent::DisplayRangeChanged);
    }

    // Scrolling

    fn scrolled(&mut self, outcome: ScrollOutcome, before: (DisplayPosition, u32)) -> ScrollOutcome {
        self.dirty.record(outcome);
        self.finish_scroll(before);
        outcome
    }

    /// Scroll so that `pos` is at the top (an API call: always repaints fully).
    pub fn scroll_to(
        &mut self,
        ctx: &ViewContext<'_>,
        pos: DisplayPosition,
        force: bool,
    ) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_to(&mut self.cache, ctx, pos, force, true);
        self.scrolled(outcome, before)
    }

    /// Scroll so that display line `line` is at the top (scrollbar drag).
    pub fn scroll_lines(&mut self, ctx: &ViewContext<'_>, line: usize) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_lines(&mut self.cache, ctx, line);
        self.scrolled(outcome, before)
    }

    /// Scroll by `delta` rows (mouse wheel).
    pub fn scroll_view_lines(&mut self, ctx: &ViewContext<'_>, delta: isize) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_view_lines(&mut self.cache, ctx, delta);
        self.scrolled(outcome, before)
    }

    /// Scroll one row down.
    pub fn scroll_next_line(&mut self, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_next_line(&mut self.cache, ctx);
        self.scrolled(outcome, before)
    }

    /// Scroll one row up.
    pub fn scroll_prev_line(&mut self, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_prev_line(&mut self.cache, ctx);
        self.scrolled(outcome, before)
    }

    /// Scroll one page down.
    pub fn scroll_next_page(&mut self, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_next_page(&mut self.cache, ctx);
        self.scrolled(outcome, before)
    }

    /// Scroll one page up.
    pub fn scroll_prev_page(&mut self, ctx: &ViewContext<'_>) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let outcome = self.scroll.scroll_prev_page(&mut self.cache, ctx);
        self.scrolled(outcome, before)
    }

    /// Set the horizontal offset in pixels. Returns `true` if it changed.
    pub fn scroll_columns(&mut self, ctx: &ViewContext<'_>, x: u32) -> bool {
        let before = self.scroll_snapshot();
        let changed = self.scroll.scroll_columns(&self.cache, ctx, x);
        self.finish_scroll(before);
        changed
    }

    /// Scroll so that the real position `pos` is visible.
    pub fn make_visible(
        &mut self,
        ctx: &ViewContext<'_>,
        pos: Position,
        force: bool,
        center: bool,
    ) -> ScrollOutcome {
        let before = self.scroll_snapshot();
        let pos = coords::to_display(ctx.folding, pos);
        let outcome = self
            .scroll
            .make_visible(&mut self.cache, ctx, pos, force, center, true);
        self.scrolled(outcome, before)
    }

    /// Mark a floating overlay as shown; while set, scrolls repaint fully.
    pub fn set_overlay_active(&mut self, active: bool) {
        self.scroll.set_overlay_active(active);
    }

    /// Display position at the top-left of the view.
    pub fn start_pos(&self) -> DisplayPosition {
        self.scroll.start_pos()
    }

    /// Horizontal offset in pixels.
    pub fn start_x(&self) -> u32 {
        self.scroll.start_x()
    }

    /// Last visible display position.
    pub fn end_pos(&self, ctx: &ViewContext<'_>) -> Option<DisplayPosition> {
        self.scroll.end_pos(&self.cache, ctx)
    }

    /// Largest legal start position.
    pub fn max_start_pos(&mut self, ctx: &ViewContext<'_>) -> DisplayPosition {
        self.scroll.max_start_pos(&mut self.cache, ctx)
    }

    /// Whole rows on screen.
    pub fn lines_displayed(&self, ctx: &ViewContext<'_>) -> usize {
        self.scroll.lines_displayed(ctx)
    }

    /// Line scrollbar state.
    pub fn scrollbar(&mut self, ctx: &ViewContext<'_>) -> ScrollbarState {
        self.scroll.scrollbar(&mut self.cache, ctx)
    }

    // Carets

    /// Move every caret with a document-level motion.
    pub fn move_cursors(&mut self, ctx: &ViewContext<'_>, motion: Motion, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let options = self.move_options();
        self.cursors
            .move_by(ctx.document, self.classifier.as_ref(), motion, extend, options);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    fn move_vertically(&mut self, ctx: &ViewContext<'_>, delta: isize, extend: bool) {
        let persistent = self.settings.persistent_selection;
        let cache = &mut self.cache;
        let scroll = &self.scroll;
        self.cursors.move_all(extend, persistent, |caret| {
            let pos = caret.position();
            let x = caret.preferred_x.unwrap_or_else(|| {
                cache
                    .line(ctx, pos.line)
                    .map_or(0, |layout| layout.column_to_row_x(ctx.renderer, pos.column))
            });
            let display = coords::to_display(ctx.folding, pos);
            let next = scroll.view_line_offset(cache, ctx, display, delta, Some(x));
            (coords::to_real(ctx.folding, next), Some(x))
        });
    }

    /// Move every caret one row up, keeping its horizontal pixel position.
    pub fn cursor_up(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        self.move_vertically(ctx, -1, extend);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Move every caret one row down, keeping its horizontal pixel position.
    pub fn cursor_down(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        self.move_vertically(ctx, 1, extend);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    fn page(&mut self, ctx: &ViewContext<'_>, direction: isize, half: bool, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let rows = self.scroll.page_rows(ctx, half) as isize * direction;

        let at_edge = if direction < 0 {
            self.scroll.start_pos() == DisplayPosition::zero()
        } else {
            self.scroll.start_pos() >= self.scroll.max_start_pos(&mut self.cache, ctx)
        };
        if !self.settings.page_up_down_moves_cursor && !at_edge {
            let outcome = self.scroll.scroll_view_lines(&mut self.cache, ctx, rows);
            self.dirty.record(outcome);
        }
        self.move_vertically(ctx, rows, extend);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Scroll a page up and move the carets with it.
    pub fn page_up(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        self.page(ctx, -1, false, extend);
    }

    /// Scroll a page down and move the carets with it.
    pub fn page_down(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        self.page(ctx, 1, false, extend);
    }

    /// Scroll half a page up and move the carets with it.
    pub fn half_page_up(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        self.page(ctx, -1, true, extend);
    }

    /// Scroll half a page down and move the carets with it.
    pub fn half_page_down(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        self.page(ctx, 1, true, extend);
    }

    /// Move to the start of the caret's row, then to the line start.
    pub fn cursor_home(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let persistent = self.settings.persistent_selection;
        let smart = self.settings.smart_home;
        let wrap = self.cache.wrap();
        let cache = &mut self.cache;
        self.cursors.move_all(extend, persistent, |caret| {
            let pos = caret.position();
            if wrap
                && let Some(row) = cache.text_layout_at(ctx, pos)
                && row.start_col() > 0
                && pos.column != row.start_col()
            {
                return (pos.with_column(row.start_col()), None);
            }
            (cursors::line_start(ctx.document, pos, smart), None)
        });
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Move to the end of the caret's row, then to the line end.
    pub fn cursor_end(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let persistent = self.settings.persistent_selection;
        let wrap = self.cache.wrap();
        let cache = &mut self.cache;
        self.cursors.move_all(extend, persistent, |caret| {
            let pos = caret.position();
            if wrap
                && let Some(row) = cache.text_layout_at(ctx, pos)
                && row.wraps()
                && pos.column != row.segment.max_caret_column()
            {
                return (pos.with_column(row.segment.max_caret_column()), None);
            }
            (
                Position::new(pos.line, ctx.document.line_length(pos.line)),
                None,
            )
        });
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Move the carets to the top-most row allowed by the caret margin.
    pub fn cursor_to_top_of_view(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let target = self.scroll.top_of_view(&mut self.cache, ctx);
        self.move_all_to(ctx, coords::to_real(ctx.folding, target), extend);
    }

    /// Move the carets to the bottom-most row allowed by the caret margin.
    pub fn cursor_to_bottom_of_view(&mut self, ctx: &ViewContext<'_>, extend: bool) {
        let target = self.scroll.bottom_of_view(&mut self.cache, ctx);
        self.move_all_to(ctx, coords::to_real(ctx.folding, target), extend);
    }

    fn move_all_to(&mut self, ctx: &ViewContext<'_>, target: Position, extend: bool) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let persistent = self.settings.persistent_selection;
        self.cursors.move_all(extend, persistent, |_| (target, None));
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Collapse to a single caret at `pos`.
    pub fn set_cursor_position(&mut self, ctx: &ViewContext<'_>, pos: Position) {
        let pos = self.clamp_position(ctx, pos);
        self.set_selection(ctx, Selection::caret(pos));
    }

    /// Collapse to a single caret holding `selection`.
    pub fn set_selection(&mut self, ctx: &ViewContext<'_>, selection: Selection) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let selection = Selection::new(
            self.clamp_position(ctx, selection.anchor),
            self.clamp_position(ctx, selection.active),
        );
        self.cursors.reset(selection);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    /// Collapse every selection to its caret.
    pub fn clear_selection(&mut self, ctx: &ViewContext<'_>) {
        let before = self.cursor_snapshot();
        self.cursors.collapse_selections();
        self.cursor_changed(ctx, before);
    }

    /// Select the whole document.
    pub fn select_all(&mut self, ctx: &ViewContext<'_>) {
        let before = self.cursor_snapshot();
        self.cursors.select_all(ctx.document);
        self.cursor_changed(ctx, before);
    }

    /// Select the word under `pos`.
    pub fn select_word(&mut self, ctx: &ViewContext<'_>, pos: Position) {
        let range = selection::word_range_at(ctx.document, self.classifier.as_ref(), ctx.clamp(pos));
        self.set_selection(ctx, Selection::from_range(range));
    }

    /// Select line `line` including its line break.
    pub fn select_line(&mut self, ctx: &ViewContext<'_>, line: usize) {
        let line = line.min(ctx.document.line_count().saturating_sub(1));
        let range = selection::line_range(ctx.document, line);
        self.set_selection(ctx, Selection::from_range(range));
    }

    /// Add a caret at `pos` and make it primary.
    pub fn add_cursor(&mut self, ctx: &ViewContext<'_>, pos: Position) -> bool {
        let before = self.cursor_snapshot();
        let added = self.cursors.add_cursor(self.clamp_position(ctx, pos));
        self.cursor_changed(ctx, before);
        added
    }

    /// Remove the caret at `pos`, or add one there.
    pub fn toggle_cursor(&mut self, ctx: &ViewContext<'_>, pos: Position) -> bool {
        let before = self.cursor_snapshot();
        let added = self.cursors.toggle_cursor(self.clamp_position(ctx, pos));
        self.cursor_changed(ctx, before);
        added
    }

    /// Remove the most recently added caret.
    pub fn remove_last_selection(&mut self, ctx: &ViewContext<'_>) -> bool {
        let before = self.cursor_snapshot();
        let removed = self.cursors.remove_last_selection();
        self.cursor_changed(ctx, before);
        removed
    }

    /// Keep only the primary caret.
    pub fn clear_secondary_cursors(&mut self, ctx: &ViewContext<'_>) {
        let before = self.cursor_snapshot();
        self.cursors.clear_secondary_cursors();
        self.cursor_changed(ctx, before);
    }

    /// Rectangular selection from `anchor` to `active`, one caret per line.
    pub fn set_block_selection(&mut self, ctx: &ViewContext<'_>, anchor: Position, active: Position) {
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        let virtual_space = !self.settings.wrap_cursor;
        self.cursors
            .set_block_selection(ctx.document, anchor, active, virtual_space);
        self.after_cursor_move(ctx, before, scroll_before);
    }

    // Mouse selection

    /// Button press: start a drag in `mode` (single, double or triple click).
    ///
    /// With `add_cursor` the selection goes to a new primary caret instead of replacing the
    /// existing ones.
    pub fn begin_selection(
        &mut self,
        ctx: &ViewContext<'_>,
        pos: Position,
        mode: SelectionMode,
        add_cursor: bool,
    ) {
        let before = self.cursor_snapshot();
        let pos = self.clamp_position(ctx, pos);
        let selection = self
            .drag
            .begin(ctx.document, self.classifier.as_ref(), pos, mode);
        if add_cursor {
            self.cursors.add_selection(selection);
        } else {
            self.cursors.reset(selection);
        }
        self.cursor_changed(ctx, before);
    }

    /// Pointer moved with the button held. Returns `false` outside a drag.
    pub fn update_selection(&mut self, ctx: &ViewContext<'_>, pos: Position) -> bool {
        let pos = self.clamp_position(ctx, pos);
        let Some(selection) = self
            .drag
            .update(ctx.document, self.classifier.as_ref(), pos)
        else {
            return false;
        };
        let before = self.cursor_snapshot();
        let scroll_before = self.scroll_snapshot();
        self.cursors.set_primary_selection(selection);
        self.after_cursor_move(ctx, before, scroll_before);
        true
    }

    /// Button released.
    pub fn end_selection(&mut self) -> Option<SelectionMode> {
        self.drag.end()
    }

    // Coordinates

    /// Viewport pixel coordinates `(x, y)` of the top-left of the caret cell at `pos`.
    ///
    /// `None` when the position is not on screen or not inside its line.
    pub fn cursor_to_coordinate(&mut self, ctx: &ViewContext<'_>, pos: Position) -> Option<(i64, u32)> {
        if pos.line >= ctx.document.line_count()
            || pos.column > ctx.document.line_length(pos.line)
            || !ctx.folding.is_line_visible(pos.line)
        {
            return None;
        }
        let display = coords::to_display(ctx.folding, pos);
        let row = self.cache.display_view_line(ctx, display, true)?;
        let y = (row as u32).saturating_mul(ctx.renderer.line_height());
        let x = self
            .cache
            .line(ctx, pos.line)?
            .column_to_row_x(ctx.renderer, pos.column);
        Some((i64::from(x) - i64::from(self.scroll.start_x()), y))
    }

    /// Real position under viewport pixel `(x, y)`, or `None` below the document.
    ///
    /// Columns past the line end are clamped unless virtual space is enabled.
    pub fn coordinate_to_cursor(&mut self, ctx: &ViewContext<'_>, x: i64, y: i64) -> Option<Position> {
        let y = u32::try_from(y).ok()?;
        let row = (y / ctx.renderer.line_height().max(1)) as usize;
        let view_line = self.cache.view_line(row)?;
        let x = (x + i64::from(self.scroll.start_x())).clamp(0, i64::from(u32::MAX)) as u32;
        let layout = self.cache.line(ctx, view_line.line)?;
        let column =
            layout.row_x_to_column(ctx.renderer, view_line.view_line, x, !self.settings.wrap_cursor);
        Some(Position::new(view_line.line, column))
    }

    // Painting

    /// Attribute spans of row `row` for the painter.
    pub fn attribute_spans(
        &self,
        row: usize,
        ranges: &mut RenderRangeList,
    ) -> Vec<(Range<usize>, Option<Attribute>)> {
        match self.cache.view_line(row) {
            Some(line) => ranges.spans(line.line, line.start_col()..line.end_col()),
            None => Vec::new(),
        }
    }

    /// Render range covering every selection, painted with `style`.
    pub fn selection_render_range(&self, style: StyleId) -> SelectionRenderRange {
        SelectionRenderRange::new(&self.cursors.selections(), style)
    }

    /// Collect pending repaint work.
    pub fn take_repaint(&mut self, ctx: &ViewContext<'_>) -> Repaint {
        self.dirty
            .take_repaint(&mut self.cache, ctx.renderer.line_height(), self.scroll.width())
    }

    /// Deliver pending repaint work to `sink`. Returns `false` if there was nothing to do.
    pub fn flush(&mut self, ctx: &ViewContext<'_>, sink: &mut dyn RepaintSink) -> bool {
        self.dirty.flush(
            &mut self.cache,
            ctx.renderer.line_height(),
            self.scroll.width(),
            sink,
        )
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}
