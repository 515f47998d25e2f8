//! Code folding: which document lines are visible.
//!
//! The view core only needs the [`Folding`] trait. [`FoldingManager`] is the reference
//! implementation: it keeps fold regions from two sources (regions derived from syntax by a
//! provider, and regions created by the user), and precomputes the set of hidden line ranges
//! so that both directions of the line mapping are `O(log n)` in the number of collapsed
//! regions.
//!
//! A collapsed region `start..=end` keeps `start` visible (the fold anchor) and hides
//! `start + 1..=end`. Hidden lines map to the display line of their anchor.

use std::ops::RangeInclusive;

use crate::document::TextChange;
use crate::error::FoldingError;
use crate::subscription::{SubscriptionId, Subscribers};

/// Line-visibility queries used by the view.
pub trait Folding {
    /// Number of display lines (document lines minus hidden lines).
    fn visible_line_count(&self) -> usize;

    /// Real line shown at display line `visible`. Inputs past the end clamp to the last line.
    fn visible_line_to_line(&self, visible: usize) -> usize;

    /// Display line of `line`; hidden lines map to their fold anchor.
    fn line_to_visible_line(&self, line: usize) -> usize;

    /// `false` for lines hidden inside a collapsed fold.
    fn is_line_visible(&self, line: usize) -> bool;

    /// The collapsed range hiding `line`, if any.
    fn folded_range_containing(&self, line: usize) -> Option<RangeInclusive<usize>>;

    /// Number of document lines this folding was computed for.
    fn line_count(&self) -> usize;
}

/// Folding that hides nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoFolding {
    line_count: usize,
}

impl NoFolding {
    /// Identity mapping over `line_count` lines.
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count: line_count.max(1),
        }
    }
}

impl Folding for NoFolding {
    fn visible_line_count(&self) -> usize {
        self.line_count
    }

    fn visible_line_to_line(&self, visible: usize) -> usize {
        visible.min(self.line_count - 1)
    }

    fn line_to_visible_line(&self, line: usize) -> usize {
        line.min(self.line_count - 1)
    }

    fn is_line_visible(&self, line: usize) -> bool {
        line < self.line_count
    }

    fn folded_range_containing(&self, _line: usize) -> Option<RangeInclusive<usize>> {
        None
    }

    fn line_count(&self) -> usize {
        self.line_count
    }
}

/// Fold region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRegion {
    /// Start line (stays visible when collapsed).
    pub start_line: usize,
    /// End line (inclusive).
    pub end_line: usize,
    /// Whether folded
    pub is_collapsed: bool,
}

impl FoldRegion {
    /// Create an expanded region for an inclusive line range.
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            is_collapsed: false,
        }
    }

    /// Create a region that starts out collapsed.
    pub fn collapsed(start_line: usize, end_line: usize) -> Self {
        Self {
            is_collapsed: true,
            ..Self::new(start_line, end_line)
        }
    }

    /// Check if line number is within fold region
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    fn span(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// What changed in a [`FoldingManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldingChange {
    /// A region was collapsed.
    Collapsed(RangeInclusive<usize>),
    /// A region was expanded.
    Expanded(RangeInclusive<usize>),
    /// Regions were added, removed, replaced or shifted by an edit.
    RegionsChanged,
}

#[derive(Debug, Clone, Copy)]
struct HiddenRange {
    anchor: usize,
    end: usize,
    /// Hidden lines in all earlier ranges.
    hidden_before: usize,
}

/// Folding manager
pub struct FoldingManager {
    line_count: usize,
    /// Regions supplied by a syntax/outline provider.
    derived_regions: Vec<FoldRegion>,
    /// Regions created explicitly by the user.
    user_regions: Vec<FoldRegion>,
    /// Disjoint top-level collapsed ranges, sorted.
    hidden: Vec<HiddenRange>,
    hidden_total: usize,
    subscribers: Subscribers<FoldingChange>,
}

impl FoldingManager {
    /// Create a manager for a document of `line_count` lines.
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count: line_count.max(1),
            derived_regions: Vec::new(),
            user_regions: Vec::new(),
            hidden: Vec::new(),
            hidden_total: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Subscribe to fold/unfold notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&FoldingChange) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Detach a folding callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Add a user fold region.
    pub fn add_region(&mut self, region: FoldRegion) -> Result<(), FoldingError> {
        self.validate(&region)?;
        let pos = self
            .user_regions
            .binary_search_by_key(&(region.start_line, region.end_line), |r| {
                (r.start_line, r.end_line)
            })
            .unwrap_or_else(|pos| pos);
        self.user_regions.insert(pos, region);
        Self::normalize_regions(&mut self.user_regions);
        self.rebuild(FoldingChange::RegionsChanged);
        Ok(())
    }

    /// Remove a user fold region.
    pub fn remove_region(&mut self, start_line: usize, end_line: usize) -> bool {
        let Some(pos) = self
            .user_regions
            .iter()
            .position(|r| r.start_line == start_line && r.end_line == end_line)
        else {
            return false;
        };
        self.user_regions.remove(pos);
        self.rebuild(FoldingChange::RegionsChanged);
        true
    }

    /// Replace provider-derived regions, keeping user regions.
    pub fn replace_derived_regions(&mut self, mut regions: Vec<FoldRegion>) {
        let max_line = self.line_count - 1;
        for r in regions.iter_mut() {
            r.start_line = r.start_line.min(max_line);
            r.end_line = r.end_line.min(max_line);
        }
        Self::normalize_regions(&mut regions);
        self.derived_regions = regions;
        self.rebuild(FoldingChange::RegionsChanged);
    }

    /// All regions, sorted by `(start, end)`.
    pub fn regions(&self) -> Vec<&FoldRegion> {
        let mut all: Vec<&FoldRegion> = self
            .derived_regions
            .iter()
            .chain(self.user_regions.iter())
            .collect();
        all.sort_by_key(|r| (r.start_line, r.end_line));
        all.dedup_by(|a, b| a.start_line == b.start_line && a.end_line == b.end_line);
        all
    }

    /// Collapse the innermost region containing `line`.
    pub fn collapse_line(&mut self, line: usize) -> bool {
        self.set_innermost(line, |r| !r.is_collapsed, true)
    }

    /// Expand the innermost collapsed region containing `line`.
    pub fn expand_line(&mut self, line: usize) -> bool {
        self.set_innermost(line, |r| r.is_collapsed, false)
    }

    /// Toggle the innermost region containing `line`.
    pub fn toggle_line(&mut self, line: usize) -> bool {
        let Some(collapsed) = self.innermost(line, |_| true).map(|r| r.is_collapsed) else {
            return false;
        };
        self.set_innermost(line, |_| true, !collapsed)
    }

    /// Collapse every region.
    pub fn collapse_all(&mut self) {
        for region in self.all_regions_mut() {
            region.is_collapsed = true;
        }
        self.rebuild(FoldingChange::RegionsChanged);
    }

    /// Expand every region.
    pub fn expand_all(&mut self) {
        for region in self.all_regions_mut() {
            region.is_collapsed = false;
        }
        self.rebuild(FoldingChange::RegionsChanged);
    }

    /// Keep regions attached to their text across an edit.
    ///
    /// Regions after the edit shift by the change in line count; a region containing the
    /// edit grows or shrinks. Regions that degenerate to a single line are dropped.
    pub fn apply_text_change(&mut self, change: &TextChange) {
        let line_delta = change.line_delta();
        self.line_count = (self.line_count as isize + line_delta).max(1) as usize;
        if line_delta != 0 {
            let edit_line = change.start.line;
            let removed_end = change.old_end.line;
            let apply = |regions: &mut Vec<FoldRegion>| {
                for region in regions.iter_mut() {
                    if edit_line < region.start_line {
                        let start = (region.start_line as isize + line_delta)
                            .max(edit_line as isize) as usize;
                        let end = (region.end_line as isize + line_delta).max(0) as usize;
                        region.start_line = if removed_end >= region.start_line {
                            edit_line
                        } else {
                            start
                        };
                        region.end_line = end;
                    } else if edit_line <= region.end_line {
                        let end = region.end_line as isize + line_delta;
                        region.end_line = end.max(region.start_line as isize) as usize;
                    }
                }
            };
            apply(&mut self.derived_regions);
            apply(&mut self.user_regions);
        }
        let max_line = self.line_count - 1;
        for regions in [&mut self.derived_regions, &mut self.user_regions] {
            for r in regions.iter_mut() {
                r.start_line = r.start_line.min(max_line);
                r.end_line = r.end_line.min(max_line);
            }
            Self::normalize_regions(regions);
        }
        if line_delta != 0 {
            self.rebuild(FoldingChange::RegionsChanged);
        }
    }

    /// Adopt a new document line count, clamping regions into it.
    pub fn set_line_count(&mut self, line_count: usize) {
        self.line_count = line_count.max(1);
        let max_line = self.line_count - 1;
        for regions in [&mut self.derived_regions, &mut self.user_regions] {
            for r in regions.iter_mut() {
                r.start_line = r.start_line.min(max_line);
                r.end_line = r.end_line.min(max_line);
            }
            Self::normalize_regions(regions);
        }
        self.rebuild(FoldingChange::RegionsChanged);
    }

    fn validate(&self, region: &FoldRegion) -> Result<(), FoldingError> {
        if region.end_line <= region.start_line || region.end_line >= self.line_count {
            return Err(FoldingError::InvalidRegion {
                start_line: region.start_line,
                end_line: region.end_line,
                line_count: self.line_count,
            });
        }
        Ok(())
    }

    fn normalize_regions(regions: &mut Vec<FoldRegion>) {
        regions.sort_by_key(|r| (r.start_line, r.end_line));
        regions.dedup_by(|a, b| a.start_line == b.start_line && a.end_line == b.end_line);
        regions.retain(|r| r.end_line > r.start_line);
    }

    fn all_regions_mut(&mut self) -> impl Iterator<Item = &mut FoldRegion> {
        self.derived_regions
            .iter_mut()
            .chain(self.user_regions.iter_mut())
    }

    fn innermost(&self, line: usize, pred: impl Fn(&FoldRegion) -> bool) -> Option<&FoldRegion> {
        self.user_regions
            .iter()
            .chain(self.derived_regions.iter())
            .filter(|r| r.contains_line(line) && pred(r))
            .min_by_key(|r| r.span())
    }

    fn set_innermost(
        &mut self,
        line: usize,
        pred: impl Fn(&FoldRegion) -> bool,
        collapsed: bool,
    ) -> bool {
        let Some((start, end)) = self
            .innermost(line, &pred)
            .map(|r| (r.start_line, r.end_line))
        else {
            return false;
        };
        // User folds win over derived folds covering the same lines.
        for region in self.all_regions_mut() {
            if region.start_line == start && region.end_line == end {
                region.is_collapsed = collapsed;
            }
        }
        let change = if collapsed {
            FoldingChange::Collapsed(start..=end)
        } else {
            FoldingChange::Expanded(start..=end)
        };
        self.rebuild(change);
        true
    }

    fn rebuild(&mut self, change: FoldingChange) {
        let mut collapsed: Vec<(usize, usize)> = self
            .derived_regions
            .iter()
            .chain(self.user_regions.iter())
            .filter(|r| r.is_collapsed && r.end_line > r.start_line)
            .map(|r| (r.start_line, r.end_line.min(self.line_count - 1)))
            .collect();
        collapsed.sort_unstable();

        self.hidden.clear();
        let mut hidden_before = 0usize;
        for (start, end) in collapsed {
            if let Some(last) = self.hidden.last_mut()
                && start <= last.end
            {
                // Nested or overlapping: the outer anchor keeps the union hidden.
                if end > last.end {
                    hidden_before += end - last.end;
                    last.end = end;
                }
                continue;
            }
            if end <= start {
                continue;
            }
            self.hidden.push(HiddenRange {
                anchor: start,
                end,
                hidden_before,
            });
            hidden_before += end - start;
        }
        self.hidden_total = hidden_before;

        tracing::debug!(
            ranges = self.hidden.len(),
            hidden_lines = self.hidden_total,
            "folding rebuilt"
        );
        self.subscribers.notify(&change);
    }

    /// Number of hidden ranges whose anchor is before `line`.
    fn ranges_before(&self, line: usize) -> usize {
        self.hidden.partition_point(|r| r.anchor < line)
    }
}

impl Folding for FoldingManager {
    fn visible_line_count(&self) -> usize {
        self.line_count - self.hidden_total
    }

    fn visible_line_to_line(&self, visible: usize) -> usize {
        let visible = visible.min(self.visible_line_count() - 1);
        let m = self
            .hidden
            .partition_point(|r| r.anchor - r.hidden_before < visible);
        let hidden = match m {
            0 => 0,
            m => {
                let r = &self.hidden[m - 1];
                r.hidden_before + (r.end - r.anchor)
            }
        };
        visible + hidden
    }

    fn line_to_visible_line(&self, line: usize) -> usize {
        let line = line.min(self.line_count - 1);
        let k = self.ranges_before(line);
        if k == 0 {
            return line;
        }
        let r = &self.hidden[k - 1];
        if line <= r.end {
            r.anchor - r.hidden_before
        } else {
            line - (r.hidden_before + (r.end - r.anchor))
        }
    }

    fn is_line_visible(&self, line: usize) -> bool {
        line < self.line_count && self.folded_range_containing(line).is_none()
    }

    fn folded_range_containing(&self, line: usize) -> Option<RangeInclusive<usize>> {
        let k = self.ranges_before(line);
        let r = self.hidden.get(k.checked_sub(1)?)?;
        (line <= r.end).then(|| r.anchor..=r.end)
    }

    fn line_count(&self) -> usize {
        self.line_count
    }
}

impl Default for FoldingManager {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_folding_manager_collapse_expand() {
        let mut manager = FoldingManager::new(30);
        manager.add_region(FoldRegion::new(5, 10)).unwrap();
        manager.add_region(FoldRegion::new(15, 20)).unwrap();

        assert!(manager.collapse_line(7));
        assert!(!manager.is_line_visible(7));
        assert!(manager.is_line_visible(5));
        assert_eq!(manager.visible_line_count(), 25);

        assert!(manager.expand_line(7));
        assert!(manager.is_line_visible(7));
        assert!(!manager.expand_line(3));
    }

    #[test]
    fn test_line_mapping_with_folding() {
        let mut manager = FoldingManager::new(30);
        manager.add_region(FoldRegion::collapsed(5, 10)).unwrap();

        assert_eq!(manager.line_to_visible_line(3), 3);
        assert_eq!(manager.line_to_visible_line(5), 5);
        // Hidden lines map to the fold anchor.
        assert_eq!(manager.line_to_visible_line(7), 5);
        assert_eq!(manager.line_to_visible_line(15), 10);

        assert_eq!(manager.visible_line_to_line(5), 5);
        assert_eq!(manager.visible_line_to_line(6), 11);
        assert_eq!(manager.visible_line_to_line(10), 15);
        assert_eq!(manager.visible_line_to_line(1000), 29);
    }

    #[test]
    fn test_nested_and_multiple_folds_round_trip() {
        let mut manager = FoldingManager::new(100);
        manager.add_region(FoldRegion::collapsed(10, 40)).unwrap();
        manager.add_region(FoldRegion::collapsed(12, 20)).unwrap();
        manager.add_region(FoldRegion::collapsed(50, 52)).unwrap();
        manager.add_region(FoldRegion::collapsed(60, 61)).unwrap();

        assert_eq!(manager.visible_line_count(), 100 - 30 - 2 - 1);
        for line in 0..100 {
            if manager.is_line_visible(line) {
                let v = manager.line_to_visible_line(line);
                assert_eq!(manager.visible_line_to_line(v), line, "line {line}");
            } else {
                let range = manager.folded_range_containing(line).unwrap();
                assert_eq!(
                    manager.line_to_visible_line(line),
                    manager.line_to_visible_line(*range.start())
                );
            }
        }
    }

    #[test]
    fn test_invalid_region_rejected() {
        let mut manager = FoldingManager::new(10);
        assert_eq!(
            manager.add_region(FoldRegion::new(4, 4)),
            Err(FoldingError::InvalidRegion {
                start_line: 4,
                end_line: 4,
                line_count: 10
            })
        );
        assert!(manager.add_region(FoldRegion::new(4, 10)).is_err());
    }

    #[test]
    fn test_regions_follow_line_insertions() {
        let mut manager = FoldingManager::new(20);
        manager.add_region(FoldRegion::collapsed(5, 8)).unwrap();

        // Two lines inserted above the fold.
        manager.apply_text_change(&TextChange::inserted(
            Position::new(1, 0),
            Position::new(3, 0),
        ));
        assert_eq!(manager.line_count(), 22);
        assert_eq!(manager.folded_range_containing(9), Some(7..=10));

        // One line removed inside the fold.
        manager.apply_text_change(&TextChange::removed(
            Position::new(8, 0),
            Position::new(9, 0),
        ));
        assert_eq!(manager.folded_range_containing(9), Some(7..=9));
    }

    #[test]
    fn test_subscribers_receive_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut manager = FoldingManager::new(10);
        {
            let seen = Rc::clone(&seen);
            manager.subscribe(move |c| seen.borrow_mut().push(c.clone()));
        }
        manager.add_region(FoldRegion::new(2, 4)).unwrap();
        manager.toggle_line(3);

        assert_eq!(
            *seen.borrow(),
            vec![FoldingChange::RegionsChanged, FoldingChange::Collapsed(2..=4)]
        );
    }
}
