mod common;

use editor_view_core::layout::{SegmentOptions, segment_line, segments_are_valid};
use editor_view_core::{
    CellMetrics, DisplayPosition, Document, FoldRegion, Folding, FoldingManager, LayoutCache,
    Motion, NoFolding, Position, ScrollController, TextDocument, ViewContext, ViewSettings,
    WrapIndent, WrapMode, coords,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{init_tracing, view_with};

fn random_line(rng: &mut StdRng) -> String {
    const PIECES: &[&str] = &["a", "bc", "def", " ", "  ", "\t", "中", "文字", "-", "_x"];
    let pieces = rng.gen_range(0..30);
    (0..pieces)
        .map(|_| PIECES[rng.gen_range(0..PIECES.len())])
        .collect()
}

fn random_doc(rng: &mut StdRng, lines: usize) -> TextDocument {
    let lines: Vec<String> = (0..lines).map(|_| random_line(rng)).collect();
    TextDocument::from_text(&lines.join("\n"))
}

#[test]
fn test_segments_partition_every_line() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);
    let metrics = CellMetrics::unit().with_tab_width(4);
    for _ in 0..500 {
        let text = random_line(&mut rng);
        let len = text.chars().count();
        let mode = if rng.gen_bool(0.5) {
            WrapMode::Char
        } else {
            WrapMode::Word
        };
        let indent = match rng.gen_range(0..3) {
            0 => WrapIndent::None,
            1 => WrapIndent::SameAsLineIndent,
            _ => WrapIndent::FixedPixels(rng.gen_range(0..6)),
        };
        let width = rng.gen_range(1..40);
        let segments = segment_line(
            &text,
            &metrics,
            SegmentOptions {
                width: Some(width),
                mode,
                indent,
            },
        );
        assert!(
            segments_are_valid(&segments, len),
            "bad segmentation of {text:?} at width {width}: {segments:?}"
        );
        if len > 0 {
            assert!(segments.iter().all(|s| !s.is_empty()), "{text:?} {segments:?}");
        }
    }
}

#[test]
fn test_display_and_real_positions_round_trip() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0002);
    for _ in 0..50 {
        let line_count = rng.gen_range(1..80);
        let mut folding = FoldingManager::new(line_count);
        for _ in 0..rng.gen_range(0..6) {
            let start = rng.gen_range(0..line_count);
            let end = rng.gen_range(start..line_count);
            // Overlapping regions are rejected; that is fine here.
            let _ = folding.add_region(FoldRegion::collapsed(start, end));
        }

        for line in (0..line_count).filter(|l| folding.is_line_visible(*l)) {
            let real = Position::new(line, 2);
            let display = coords::to_display(&folding, real);
            assert_eq!(coords::to_real(&folding, display), real);
        }
        for display in 0..folding.visible_line_count() {
            let pos = DisplayPosition::new(display, 1);
            assert_eq!(coords::to_display(&folding, coords::to_real(&folding, pos)), pos);
        }
    }
}

#[test]
fn test_view_line_offset_is_invertible() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);
    let doc = random_doc(&mut rng, 300);
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::unit();
    let ctx = ViewContext::new(&doc, &folding, &metrics);

    let mut cache = LayoutCache::new();
    cache.set_wrap(true);
    cache.set_wrap_mode(WrapMode::Word);
    cache.set_view_width(12);
    let mut scroll = ScrollController::new();
    scroll.apply_settings(&ViewSettings::default());
    scroll.resize(&mut cache, &ctx, 12, 30);

    // Row starts of the whole document, in order.
    let mut rows = Vec::new();
    for line in 0..doc.line_count() {
        let layout = cache.line(&ctx, line).unwrap();
        for segment in layout.segments() {
            rows.push(DisplayPosition::new(line, segment.start_col));
        }
    }

    for _ in 0..300 {
        let at = rng.gen_range(0..rows.len());
        let n = rng.gen_range(-40isize..=40);
        let target = at as isize + n;
        if target < 0 || target >= rows.len() as isize {
            continue;
        }
        let there = scroll.view_line_offset(&mut cache, &ctx, rows[at], n, None);
        assert_eq!(there, rows[target as usize]);
        let back = scroll.view_line_offset(&mut cache, &ctx, there, -n, None);
        assert_eq!(back, rows[at], "offset {n} from row {at}");
    }
}

#[test]
fn test_scroll_clamp_is_idempotent() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0004);
    let doc = random_doc(&mut rng, 200);
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::unit();
    let ctx = ViewContext::new(&doc, &folding, &metrics);

    for scroll_past_end in [false, true] {
        let mut view = view_with(ViewSettings {
            scroll_past_end,
            ..ViewSettings::default()
        });
        view.resize(&ctx, 16, 25);
        let max = view.max_start_pos(&ctx);

        for _ in 0..100 {
            let target = DisplayPosition::new(rng.gen_range(0..260), 0);
            view.scroll_to(&ctx, target, false);
            let once = view.start_pos();
            view.scroll_to(&ctx, target, false);
            assert_eq!(view.start_pos(), once);
            assert!(once <= max);
            if target > max {
                assert_eq!(once, max);
            }
        }
    }
}

#[test]
fn test_make_visible_respects_caret_margin() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0005);
    let doc = random_doc(&mut rng, 150);
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::unit();
    let ctx = ViewContext::new(&doc, &folding, &metrics);

    let mut view = view_with(ViewSettings {
        auto_center_lines: 3,
        ..ViewSettings::default()
    });
    view.resize(&ctx, 14, 20);
    let lines = view.lines_displayed(&ctx);
    let margin = 3;

    for _ in 0..200 {
        view.scroll_lines(&ctx, rng.gen_range(0..200));
        let line = rng.gen_range(0..doc.line_count());
        let column = rng.gen_range(0..=doc.line_length(line));
        let pos = Position::new(line, column);
        view.make_visible(&ctx, pos, false, false);

        let start = view.start_pos();
        let max = view.max_start_pos(&ctx);
        let row = view
            .layout_cache()
            .view_lines()
            .take(lines)
            .position(|row| {
                row.is_some_and(|r| r.line == line && r.segment.contains_column(column))
            })
            .unwrap_or_else(|| panic!("{pos} not on screen after make_visible"));
        if start > DisplayPosition::zero() {
            assert!(row >= margin, "{pos} on row {row}");
        }
        if start < max {
            assert!(row <= lines - 1 - margin, "{pos} on row {row}");
        }
    }
}

#[test]
fn test_carets_never_overlap() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0006);
    let doc = random_doc(&mut rng, 40);
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::unit();
    let ctx = ViewContext::new(&doc, &folding, &metrics);
    let mut view = view_with(ViewSettings::default());
    view.resize(&ctx, 30, 15);

    let motions = [
        Motion::CharLeft,
        Motion::CharRight,
        Motion::WordLeft,
        Motion::WordRight,
        Motion::LineStart,
        Motion::LineEnd,
    ];
    for step in 0..600 {
        let line = rng.gen_range(0..doc.line_count());
        let pos = Position::new(line, rng.gen_range(0..=doc.line_length(line)));
        match rng.gen_range(0..7) {
            0 => {
                view.add_cursor(&ctx, pos);
            }
            1 => {
                view.toggle_cursor(&ctx, pos);
            }
            2 => view.move_cursors(&ctx, motions[rng.gen_range(0..motions.len())], rng.gen_bool(0.5)),
            3 => view.cursor_down(&ctx, rng.gen_bool(0.5)),
            4 => view.cursor_up(&ctx, rng.gen_bool(0.5)),
            5 => {
                view.remove_last_selection(&ctx);
            }
            _ => view.set_block_selection(&ctx, pos, Position::new((line + 3) % doc.line_count(), 2)),
        }

        let mut selections = view.cursors().selections();
        selections.sort_by_key(|s| (s.start(), s.end()));
        for pair in selections.windows(2) {
            assert!(
                pair[0].end() <= pair[1].start(),
                "step {step}: overlapping {:?}",
                pair
            );
            assert_ne!(pair[0].active, pair[1].active, "step {step}: shared position");
        }
        assert!(view.cursors().primary_index() < view.cursors().len());
    }
}

#[test]
fn test_forced_make_visible_puts_caret_row_on_top() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed_0007);
    let mut lines: Vec<String> = (0..40).map(|i| format!("line {i}")).collect();
    lines[20] = "w".repeat(50);
    let doc = TextDocument::from_text(&lines.join("\n"));
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::unit();
    let ctx = ViewContext::new(&doc, &folding, &metrics);

    let mut view = view_with(ViewSettings {
        wrap_mode: WrapMode::Char,
        ..ViewSettings::default()
    });
    view.resize(&ctx, 10, 6);
    let lines_shown = view.lines_displayed(&ctx);

    for _ in 0..100 {
        view.scroll_lines(&ctx, rng.gen_range(0..40));
        let column = rng.gen_range(0..50);
        let pos = Position::new(20, column);
        view.make_visible(&ctx, pos, true, false);

        let row = view
            .layout_cache()
            .view_lines()
            .take(lines_shown)
            .position(|row| {
                row.is_some_and(|r| r.line == 20 && r.segment.contains_column(column))
            })
            .unwrap_or_else(|| panic!("{pos} not on screen after forced make_visible"));
        assert_eq!(row, 0, "{pos}");
        assert_eq!(view.start_pos(), DisplayPosition::new(20, column / 10 * 10));
    }

    view.scroll_to(&ctx, DisplayPosition::new(20, 5), true);
    assert_eq!(view.start_pos(), DisplayPosition::new(20, 0));
    let first = view.layout_cache().view_line(0).unwrap();
    assert_eq!((first.line, first.start_col()), (20, 0));
}
