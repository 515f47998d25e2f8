#![warn(missing_docs)]
//! Editor View Core - headless view engine for text editors
//!
//! # Overview
//!
//! `editor-view-core` is everything between a document and a painter: it decides which
//! document lines are on screen, how each line is broken into rows when soft wrapping is on,
//! where the carets and selections are, and which rows must be repainted after an edit, a
//! scroll or a fold.
//!
//! It draws nothing. Text metrics come from a [`Renderer`], line visibility from a
//! [`Folding`], and line text from a [`Document`]. All three are borrowed for the duration of
//! a call through a [`ViewContext`], so several views can share one document.
//!
//! # Core Features
//!
//! - **Layout Cache**: per-line soft-wrap segmentation, cached and shifted across edits
//! - **Incremental Scrolling**: row-level scroll deltas so hosts can blit instead of repaint
//! - **Caret Margin**: configurable number of rows kept around the caret
//! - **Multi-Cursor**: carets with selections, merged whenever they overlap
//! - **Mouse Selection**: character, word and line drags anchored on the initial click
//! - **Minimal Repaint**: dirty row tracking flushed as pixel rectangles
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  View (events, config, edits, folding)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Carets, Selection Drag, Render Ranges      │  ← Interaction
//! ├─────────────────────────────────────────────┤
//! │  Scroll Controller + Dirty Tracker          │  ← Viewport
//! ├─────────────────────────────────────────────┤
//! │  Layout Cache (lines → rows)                │  ← Text Layout
//! ├─────────────────────────────────────────────┤
//! │  Document / Folding / Renderer              │  ← Collaborators
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_view_core::{CellMetrics, Document, NoFolding, Position, TextDocument, View, ViewContext};
//!
//! let text: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
//! let doc = TextDocument::from_text(&text.join("\n"));
//! let folding = NoFolding::new(doc.line_count());
//! let metrics = CellMetrics::new(8, 16);
//! let ctx = ViewContext::new(&doc, &folding, &metrics);
//!
//! let mut view = View::default();
//! view.resize(&ctx, 640, 160);
//!
//! // Moving the caret below the view scrolls it onto the last row.
//! view.set_cursor_position(&ctx, Position::new(42, 3));
//! assert_eq!(view.start_pos().line, 33);
//! ```
//!
//! # Module Description
//!
//! - [`position`] - real and display positions
//! - [`document`] - line storage and edit descriptions
//! - [`folding`] - line visibility
//! - [`layout`] - single-line soft-wrap segmentation
//! - [`layout_cache`] - cached line layouts and the rows on screen
//! - [`scroll`] - start position, scrolling and caret margins
//! - [`selection`] / [`cursors`] - selections, carets and motions
//! - [`dirty`] - repaint tracking
//! - [`render_range`] - attribute merging for painting
//! - [`config`] - layered view settings
//! - [`view`] - the facade tying it together

pub mod config;
pub mod context;
pub mod coords;
pub mod cursors;
pub mod dirty;
pub mod document;
pub mod error;
pub mod folding;
pub mod layout;
pub mod layout_cache;
pub mod metrics;
pub mod position;
pub mod render_range;
pub mod scroll;
pub mod selection;
mod subscription;
pub mod view;

pub use config::{ConfigChange, ConfigKey, ConfigValue, GlobalConfig, ViewConfig, ViewSettings};
pub use context::ViewContext;
pub use cursors::{Caret, Motion, MoveOptions, MultiCursor};
pub use dirty::{DirtyTracker, Repaint, RepaintRect, RepaintSink};
pub use document::{Document, TextChange, TextDocument};
pub use error::{ConfigError, DocumentError, FoldingError};
pub use folding::{FoldRegion, Folding, FoldingChange, FoldingManager, NoFolding};
pub use layout::{Segment, WrapIndent, WrapMode};
pub use layout_cache::{LayoutCache, LineLayout, ViewLine};
pub use metrics::{CellMetrics, Renderer};
pub use position::{DisplayPosition, Position};
pub use render_range::{
    Attribute, NormalRenderRange, RenderRange, RenderRangeList, SelectionRenderRange, StyleId,
};
pub use scroll::{ScrollController, ScrollOutcome, ScrollbarState};
pub use selection::{
    DefaultWordClassifier, DragState, Selection, SelectionDrag, SelectionMode, WordClassifier,
};
pub use subscription::SubscriptionId;
pub use view::{View, ViewEvent};
