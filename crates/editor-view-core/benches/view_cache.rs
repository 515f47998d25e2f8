use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use editor_view_core::{
    CellMetrics, DisplayPosition, Document, NoFolding, Position, TextDocument, View, ViewContext,
};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 96);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog, then wraps around the view edge\n"
        ));
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn bench_scroll_wrapped(c: &mut Criterion) {
    let doc = TextDocument::from_text(&large_text(50_000));
    let folding = NoFolding::new(doc.line_count());
    let metrics = CellMetrics::new(8, 16);
    let ctx = ViewContext::new(&doc, &folding, &metrics);

    let mut view = View::default();
    view.resize(&ctx, 480, 960);
    view.scroll_to(&ctx, DisplayPosition::new(25_000, 0), false);

    c.bench_function("scroll_wrapped/60_rows_by_1", |b| {
        b.iter(|| {
            for _ in 0..30 {
                view.scroll_next_line(&ctx);
            }
            for _ in 0..30 {
                view.scroll_prev_line(&ctx);
            }
            black_box(view.take_repaint(&ctx));
        })
    });

    c.bench_function("scroll_wrapped/jump", |b| {
        let mut line = 0usize;
        b.iter(|| {
            line = (line + 7_919) % 50_000;
            view.scroll_to(&ctx, DisplayPosition::new(line, 0), false);
            black_box(view.start_pos());
        })
    });
}

fn bench_typing_in_view(c: &mut Criterion) {
    let text = large_text(50_000);
    let metrics = CellMetrics::new(8, 16);

    c.bench_function("typing_in_view/100_inserts", |b| {
        b.iter_batched(
            || {
                let doc = TextDocument::from_text(&text);
                let mut view = View::default();
                {
                    let folding = NoFolding::new(doc.line_count());
                    let ctx = ViewContext::new(&doc, &folding, &metrics);
                    view.resize(&ctx, 480, 960);
                    view.scroll_to(&ctx, DisplayPosition::new(25_000, 0), false);
                    view.set_cursor_position(&ctx, Position::new(25_010, 7));
                }
                (doc, view)
            },
            |(mut doc, mut view)| {
                let folding = NoFolding::new(doc.line_count());
                let mut column = 7;
                for _ in 0..100 {
                    let change = doc.insert(Position::new(25_010, column), "x").unwrap();
                    let ctx = ViewContext::new(&doc, &folding, &metrics);
                    view.apply_text_change(&ctx, &change);
                    column += 1;
                }
                black_box(view.cursors().position());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_newlines_above_view(c: &mut Criterion) {
    let text = large_text(50_000);
    let metrics = CellMetrics::new(8, 16);

    c.bench_function("newlines_above_view/20_splits", |b| {
        b.iter_batched(
            || {
                let doc = TextDocument::from_text(&text);
                let mut view = View::default();
                {
                    let folding = NoFolding::new(doc.line_count());
                    let ctx = ViewContext::new(&doc, &folding, &metrics);
                    view.resize(&ctx, 480, 960);
                    view.scroll_to(&ctx, DisplayPosition::new(25_000, 0), false);
                }
                (doc, view)
            },
            |(mut doc, mut view)| {
                for i in 0..20 {
                    let change = doc.split_line(Position::new(100 + i, 3)).unwrap();
                    let folding = NoFolding::new(doc.line_count());
                    let ctx = ViewContext::new(&doc, &folding, &metrics);
                    view.apply_text_change(&ctx, &change);
                }
                black_box(view.start_pos());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_scroll_wrapped,
    bench_typing_in_view,
    bench_newlines_above_view
);
criterion_main!(benches);
