//! Text metrics supplied by the renderer.
//!
//! The view core measures text only through [`Renderer`]. All horizontal quantities are in
//! pixels measured from the start of the unwrapped line, so tab stops and proportional fonts
//! are the renderer's business. [`CellMetrics`] implements the trait for a monospace grid
//! using UAX #11 cell widths, which is what terminal frontends and the tests use.

use unicode_width::UnicodeWidthChar;

/// Default tab width (in cells) used when a caller does not specify a tab width.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Font metrics and text measurement.
pub trait Renderer {
    /// Height of one view line in pixels.
    fn line_height(&self) -> u32;

    /// Advance of `ch` when drawn at pen position `x` (pixels from the line start).
    fn advance(&self, ch: char, x: u32) -> u32;

    /// Width used for virtual columns past the end of a line.
    fn space_width(&self) -> u32 {
        self.advance(' ', 0).max(1)
    }

    /// Pixel x of the left edge of `column` in `text`.
    ///
    /// Columns past the end of the text are measured as trailing spaces.
    fn column_to_x(&self, text: &str, column: usize) -> u32 {
        let mut x = 0u32;
        let mut count = 0usize;
        for ch in text.chars().take(column) {
            x = x.saturating_add(self.advance(ch, x));
            count += 1;
        }
        let virtual_cols = column.saturating_sub(count) as u32;
        x.saturating_add(virtual_cols.saturating_mul(self.space_width()))
    }

    /// Column whose left edge is nearest to `x`.
    ///
    /// The result may exceed the text length when `x` is past the end; callers clamp unless
    /// virtual space is enabled.
    fn x_to_column(&self, text: &str, x: u32) -> usize {
        let mut pen = 0u32;
        let mut column = 0usize;
        for ch in text.chars() {
            let w = self.advance(ch, pen);
            if x < pen.saturating_add(w.div_ceil(2)) {
                return column;
            }
            pen = pen.saturating_add(w);
            column += 1;
        }
        let space = self.space_width();
        let extra = x.saturating_sub(pen).saturating_add(space / 2) / space;
        column + extra as usize
    }
}

/// Calculate visual width of a character (based on UAX #11)
///
/// Return value:
/// - 1: Narrow character (ASCII, etc.)
/// - 2: Wide character (CJK, fullwidth, etc.)
/// - 0: Zero-width character (combining characters, etc.)
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Width in cells of `ch` at cell offset `cell_offset_in_line`; `'\t'` advances to the next tab stop.
pub fn cell_width_at(ch: char, cell_offset_in_line: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - cell_offset_in_line % tab_width
    } else {
        char_width(ch)
    }
}

/// Monospace metrics: every cell is `cell_width` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    cell_width: u32,
    line_height: u32,
    tab_width: usize,
}

impl CellMetrics {
    /// Grid of `cell_width` x `line_height` pixel cells.
    pub fn new(cell_width: u32, line_height: u32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            line_height: line_height.max(1),
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }

    /// One pixel per cell and per row, so pixel values equal cell counts.
    pub fn unit() -> Self {
        Self::new(1, 1)
    }

    /// Set the tab width in cells.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Cell width in pixels.
    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    /// Tab width in cells.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new(8, 16)
    }
}

impl Renderer for CellMetrics {
    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn advance(&self, ch: char, x: u32) -> u32 {
        let cell = (x / self.cell_width) as usize;
        cell_width_at(ch, cell, self.tab_width) as u32 * self.cell_width
    }

    fn space_width(&self) -> u32 {
        self.cell_width
    }
}
