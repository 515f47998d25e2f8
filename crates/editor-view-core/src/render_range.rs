//! Render ranges: attribute sources merged while painting a row.
//!
//! The painter walks a row left to right. At every position it asks each range for the
//! attribute active there and for the next position where that may change; between two
//! boundaries the merged attribute is constant, so the row splits into spans.
//!
//! The set of range kinds is closed, so [`RenderRange`] is an enum rather than a trait.

use std::ops::Range;

use crate::position::Position;
use crate::selection::Selection;

/// Identifier of a style owned by the host (a highlighting attribute, the selection colors).
pub type StyleId = u32;

/// Merged set of styles, in priority order (later entries override earlier ones).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribute {
    styles: Vec<StyleId>,
}

impl Attribute {
    /// Attribute with a single style.
    pub fn new(style: StyleId) -> Self {
        Self {
            styles: vec![style],
        }
    }

    /// Styles in priority order.
    pub fn styles(&self) -> &[StyleId] {
        &self.styles
    }

    /// `true` if `style` is part of the set.
    pub fn contains(&self, style: StyleId) -> bool {
        self.styles.contains(&style)
    }

    /// Layer `other` on top of `self`.
    pub fn merge(&mut self, other: &Attribute) {
        for style in &other.styles {
            self.styles.retain(|s| s != style);
            self.styles.push(*style);
        }
    }
}

/// Ranges carrying attributes, sorted by start, not overlapping each other.
#[derive(Debug, Clone, Default)]
pub struct NormalRenderRange {
    ranges: Vec<(Range<Position>, Attribute)>,
    current: usize,
    next_boundary: Option<Position>,
    attribute: Option<Attribute>,
}

impl NormalRenderRange {
    /// Empty range set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `range` with `attribute`. Empty ranges are ignored.
    pub fn add_range(&mut self, range: Range<Position>, attribute: Attribute) {
        if range.start >= range.end {
            return;
        }
        let at = self
            .ranges
            .partition_point(|(r, _)| r.start <= range.start);
        self.ranges.insert(at, (range, attribute));
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// `true` without ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn next_boundary(&self) -> Option<Position> {
        self.next_boundary
    }

    fn current_attribute(&self) -> Option<&Attribute> {
        self.attribute.as_ref()
    }

    fn advance_to(&mut self, pos: Position) -> bool {
        let mut index = self.current;
        while let Some((range, attribute)) = self.ranges.get(index) {
            if range.end <= pos {
                index += 1;
                continue;
            }
            let moved = index != self.current;
            self.current = index;
            if range.start > pos {
                self.next_boundary = Some(range.start);
                self.attribute = None;
            } else {
                self.next_boundary = Some(range.end);
                self.attribute = Some(attribute.clone());
            }
            return moved;
        }
        self.current = index;
        self.next_boundary = None;
        self.attribute = None;
        false
    }
}

/// The selections of a view, painted with one style.
#[derive(Debug, Clone)]
pub struct SelectionRenderRange {
    inner: NormalRenderRange,
}

impl SelectionRenderRange {
    /// Render the non-empty `selections` with `style`.
    pub fn new(selections: &[Selection], style: StyleId) -> Self {
        let mut inner = NormalRenderRange::new();
        for selection in selections.iter().filter(|s| !s.is_empty()) {
            inner.add_range(selection.range(), Attribute::new(style));
        }
        Self { inner }
    }
}

/// One attribute source.
#[derive(Debug, Clone)]
pub enum RenderRange {
    /// Arbitrary attributed ranges (highlighting, search matches).
    Normal(NormalRenderRange),
    /// Selections.
    Selection(SelectionRenderRange),
}

impl RenderRange {
    fn ranges(&self) -> &NormalRenderRange {
        match self {
            RenderRange::Normal(r) => r,
            RenderRange::Selection(r) => &r.inner,
        }
    }

    fn ranges_mut(&mut self) -> &mut NormalRenderRange {
        match self {
            RenderRange::Normal(r) => r,
            RenderRange::Selection(r) => &mut r.inner,
        }
    }

    /// Next position where the attribute may change; `None` after the last range.
    pub fn next_boundary(&self) -> Option<Position> {
        self.ranges().next_boundary()
    }

    /// Move to `pos`, which must not precede earlier calls. Returns `true` if the range moved
    /// on to a later entry.
    pub fn advance_to(&mut self, pos: Position) -> bool {
        self.ranges_mut().advance_to(pos)
    }

    /// Attribute active at the current position.
    pub fn current_attribute(&self) -> Option<&Attribute> {
        self.ranges().current_attribute()
    }
}

impl From<NormalRenderRange> for RenderRange {
    fn from(range: NormalRenderRange) -> Self {
        RenderRange::Normal(range)
    }
}

impl From<SelectionRenderRange> for RenderRange {
    fn from(range: SelectionRenderRange) -> Self {
        RenderRange::Selection(range)
    }
}

/// Every attribute source of one paint pass.
#[derive(Debug, Clone, Default)]
pub struct RenderRangeList {
    ranges: Vec<RenderRange>,
}

impl RenderRangeList {
    /// No sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source; later sources take priority when merging.
    pub fn push(&mut self, range: impl Into<RenderRange>) {
        self.ranges.push(range.into());
    }

    /// Nearest boundary over all sources.
    pub fn next_boundary(&self) -> Option<Position> {
        self.ranges.iter().filter_map(RenderRange::next_boundary).min()
    }

    /// Advance every source to `pos`. Returns `true` if any moved to a later entry.
    pub fn advance_to(&mut self, pos: Position) -> bool {
        let mut moved = false;
        for range in &mut self.ranges {
            moved |= range.advance_to(pos);
        }
        moved
    }

    /// `true` if any source has an attribute at the current position.
    pub fn has_attribute(&self) -> bool {
        self.ranges.iter().any(|r| r.current_attribute().is_some())
    }

    /// Merged attribute at the current position.
    pub fn generate_attribute(&self) -> Option<Attribute> {
        let mut merged: Option<Attribute> = None;
        for attribute in self.ranges.iter().filter_map(RenderRange::current_attribute) {
            match merged.as_mut() {
                Some(m) => m.merge(attribute),
                None => merged = Some(attribute.clone()),
            }
        }
        merged
    }

    /// Split columns `columns` of real line `line` into spans of constant attribute.
    ///
    /// Rows must be requested in document order within one pass.
    pub fn spans(&mut self, line: usize, columns: Range<usize>) -> Vec<(Range<usize>, Option<Attribute>)> {
        let mut spans: Vec<(Range<usize>, Option<Attribute>)> = Vec::new();
        let mut column = columns.start;
        while column < columns.end {
            self.advance_to(Position::new(line, column));
            let stop = match self.next_boundary() {
                Some(b) if b.line == line => b.column.clamp(column + 1, columns.end),
                _ => columns.end,
            };
            let attribute = self.generate_attribute();
            match spans.last_mut() {
                Some((range, last)) if *last == attribute => range.end = stop,
                _ => spans.push((column..stop, attribute)),
            }
            column = stop;
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    #[test]
    fn test_normal_range_boundaries() {
        let mut normal = NormalRenderRange::new();
        normal.add_range(p(0, 5)..p(0, 8), Attribute::new(2));
        normal.add_range(p(0, 1)..p(0, 3), Attribute::new(1));
        normal.add_range(p(0, 4)..p(0, 4), Attribute::new(9));
        assert_eq!(normal.len(), 2);

        let mut range = RenderRange::from(normal);
        range.advance_to(p(0, 0));
        assert_eq!(range.next_boundary(), Some(p(0, 1)));
        assert!(range.current_attribute().is_none());

        range.advance_to(p(0, 1));
        assert_eq!(range.next_boundary(), Some(p(0, 3)));
        assert_eq!(range.current_attribute(), Some(&Attribute::new(1)));

        assert!(range.advance_to(p(0, 3)));
        assert_eq!(range.next_boundary(), Some(p(0, 5)));

        range.advance_to(p(0, 9));
        assert_eq!(range.next_boundary(), None);
    }

    #[test]
    fn test_list_merges_attributes() {
        let mut highlight = NormalRenderRange::new();
        highlight.add_range(p(0, 0)..p(0, 10), Attribute::new(1));
        let selection = SelectionRenderRange::new(&[Selection::new(p(0, 6), p(0, 3))], 7);

        let mut list = RenderRangeList::new();
        list.push(highlight);
        list.push(selection);

        list.advance_to(p(0, 4));
        assert!(list.has_attribute());
        assert_eq!(list.next_boundary(), Some(p(0, 6)));
        assert_eq!(list.generate_attribute().unwrap().styles(), &[1, 7]);
    }

    #[test]
    fn test_spans_split_row() {
        let mut highlight = NormalRenderRange::new();
        highlight.add_range(p(0, 2)..p(1, 1), Attribute::new(1));
        let mut list = RenderRangeList::new();
        list.push(highlight);
        list.push(SelectionRenderRange::new(&[Selection::new(p(0, 4), p(0, 6))], 7));

        let spans = list.spans(0, 0..8);
        let one = Some(Attribute::new(1));
        let mut both = Attribute::new(1);
        both.merge(&Attribute::new(7));
        assert_eq!(
            spans,
            vec![
                (0..2, None),
                (2..4, one.clone()),
                (4..6, Some(both)),
                (6..8, one.clone()),
            ]
        );

        assert_eq!(list.spans(1, 0..3), vec![(0..1, one), (1..3, None)]);
    }
}
