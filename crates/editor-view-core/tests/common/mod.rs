#![allow(dead_code)]

use std::sync::Once;

use editor_view_core::{TextDocument, View, ViewConfig, ViewSettings};

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber once per test binary; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `count` lines reading `line 0`, `line 1`, ...
pub fn numbered_doc(count: usize) -> TextDocument {
    let lines: Vec<String> = (0..count).map(|i| format!("line {i}")).collect();
    TextDocument::from_text(&lines.join("\n"))
}

/// `count` lines where line `i` holds `i + 1` characters.
pub fn staircase_doc(count: usize) -> TextDocument {
    let lines: Vec<String> = (0..count).map(|i| "#".repeat(i + 1)).collect();
    TextDocument::from_text(&lines.join("\n"))
}

/// A view built from `settings` without a global config.
pub fn view_with(settings: ViewSettings) -> View {
    View::new(ViewConfig::from_settings(settings))
}

/// A view with soft wrapping off.
pub fn unwrapped_view() -> View {
    view_with(ViewSettings {
        dyn_word_wrap: false,
        ..ViewSettings::default()
    })
}
