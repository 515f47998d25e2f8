//! Soft-wrap segmentation of a single line.
//!
//! A line of text is cut into [`Segment`]s, each of which becomes one view line. Segments are
//! produced by greedy filling: characters are added while the pen stays inside the available
//! width. In [`WrapMode::Word`] the cut moves back to the last whitespace that fits, falling
//! back to a hard character cut for words wider than the view.
//!
//! Guarantees, for any input:
//!
//! - segments are contiguous, non-overlapping and cover `[0, len]`;
//! - every segment of a non-empty line holds at least one character, so a single glyph wider
//!   than the view overflows instead of producing empty rows;
//! - all segments except the last have `wraps == true`.

use crate::metrics::Renderer;

/// Soft wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No soft wrapping (each line is a single view line).
    None,
    /// Wrap at character boundaries.
    #[default]
    Char,
    /// Prefer wrapping at word boundaries (whitespace), falling back to character wrap.
    Word,
}

/// Wrapped-line indentation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapIndent {
    /// No indentation for wrapped continuations.
    #[default]
    None,
    /// Indent continuations by the width of the line's leading whitespace.
    SameAsLineIndent,
    /// Indent continuations by a fixed number of pixels.
    FixedPixels(u32),
}

/// One view line of a laid-out line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First column (inclusive).
    pub start_col: usize,
    /// End column (exclusive).
    pub end_col: usize,
    /// `true` if the line continues on the next view line.
    pub wraps: bool,
    /// Pixel x of `start_col` within the unwrapped line.
    pub start_x: u32,
    /// Pixel width of the segment's text.
    pub width: u32,
    /// Pixel indent applied before the text (continuation rows only).
    pub indent: u32,
}

impl Segment {
    /// Number of characters in the segment.
    pub fn len(&self) -> usize {
        self.end_col - self.start_col
    }

    /// `true` for the single segment of an empty line.
    pub fn is_empty(&self) -> bool {
        self.start_col == self.end_col
    }

    /// Largest column a caret may take on this row.
    ///
    /// A wrapping row cannot hold a caret at `end_col`: that position belongs to the next
    /// row.
    pub fn max_caret_column(&self) -> usize {
        if self.wraps {
            self.end_col.saturating_sub(1).max(self.start_col)
        } else {
            self.end_col
        }
    }

    /// `true` if `column` is drawn on this row.
    pub fn contains_column(&self, column: usize) -> bool {
        column >= self.start_col && (column < self.end_col || !self.wraps)
    }

    /// Total pixel extent of the row (indent plus text).
    pub fn extent(&self) -> u32 {
        self.indent.saturating_add(self.width)
    }
}

/// Parameters for [`segment_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Available width in pixels; `None` lays the line out unbounded.
    pub width: Option<u32>,
    /// Soft wrapping mode.
    pub mode: WrapMode,
    /// Continuation indent policy.
    pub indent: WrapIndent,
}

impl SegmentOptions {
    /// Options that never wrap.
    pub fn unwrapped() -> Self {
        Self {
            width: None,
            mode: WrapMode::None,
            indent: WrapIndent::None,
        }
    }
}

struct Glyph {
    ch: char,
    x: u32,
    advance: u32,
}

/// Cut `text` into view-line segments.
pub fn segment_line(text: &str, renderer: &dyn Renderer, options: SegmentOptions) -> Vec<Segment> {
    let mut glyphs = Vec::with_capacity(text.len());
    let mut pen = 0u32;
    for ch in text.chars() {
        let advance = renderer.advance(ch, pen);
        glyphs.push(Glyph { ch, x: pen, advance });
        pen = pen.saturating_add(advance);
    }
    let total_width = pen;
    let len = glyphs.len();

    let width = match (options.mode, options.width) {
        (WrapMode::None, _) | (_, None) | (_, Some(0)) => None,
        (_, Some(w)) => Some(w),
    };
    let Some(width) = width.filter(|w| *w < total_width) else {
        return vec![Segment {
            start_col: 0,
            end_col: len,
            wraps: false,
            start_x: 0,
            width: total_width,
            indent: 0,
        }];
    };

    let indent = continuation_indent(&glyphs, options.indent, width, renderer.space_width());
    let x_at = |col: usize| glyphs.get(col).map_or(total_width, |g| g.x);

    let mut segments = Vec::new();
    let mut seg_start = 0usize;
    let mut seg_indent = 0u32;
    let mut last_break: Option<usize> = None;
    let mut i = 0usize;
    while i < len {
        let glyph = &glyphs[i];
        let used = glyph.x - x_at(seg_start) + seg_indent;
        if i > seg_start && used.saturating_add(glyph.advance) > width {
            let cut = match (options.mode, last_break) {
                (WrapMode::Word, Some(b)) if b > seg_start => b,
                _ => i,
            };
            segments.push(Segment {
                start_col: seg_start,
                end_col: cut,
                wraps: true,
                start_x: x_at(seg_start),
                width: x_at(cut) - x_at(seg_start),
                indent: seg_indent,
            });
            seg_start = cut;
            seg_indent = indent;
            last_break = None;
            // Re-check glyph `i` against the new row.
            continue;
        }
        if glyph.ch.is_whitespace() {
            last_break = Some(i + 1);
        }
        i += 1;
    }
    segments.push(Segment {
        start_col: seg_start,
        end_col: len,
        wraps: false,
        start_x: x_at(seg_start),
        width: total_width - x_at(seg_start),
        indent: seg_indent,
    });
    segments
}

fn continuation_indent(glyphs: &[Glyph], policy: WrapIndent, width: u32, space: u32) -> u32 {
    let raw = match policy {
        WrapIndent::None => 0,
        WrapIndent::FixedPixels(px) => px,
        WrapIndent::SameAsLineIndent => glyphs
            .iter()
            .find(|g| g.ch != ' ' && g.ch != '\t')
            .map_or(0, |g| g.x),
    };
    // Leave room for at least one cell of text.
    raw.min(width.saturating_sub(space))
}

/// Check the partition invariant of a segmentation of a line of `len` characters.
pub fn segments_are_valid(segments: &[Segment], len: usize) -> bool {
    let Some(first) = segments.first() else {
        return false;
    };
    let Some(last) = segments.last() else {
        return false;
    };
    if first.start_col != 0 || last.end_col != len || last.wraps {
        return false;
    }
    segments.windows(2).all(|w| {
        w[0].end_col == w[1].start_col && w[0].wraps && w[0].end_col > w[0].start_col
    })
}
