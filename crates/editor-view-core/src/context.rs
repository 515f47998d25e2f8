//! Borrowed collaborators for one view operation.

use crate::document::Document;
use crate::folding::Folding;
use crate::metrics::Renderer;
use crate::position::{DisplayPosition, Position};

/// The document, folding and renderer a view reads from during a call.
///
/// Views never store these references; every operation that needs them takes a context.
#[derive(Clone, Copy)]
pub struct ViewContext<'a> {
    /// Line storage.
    pub document: &'a dyn Document,
    /// Line visibility.
    pub folding: &'a dyn Folding,
    /// Text metrics.
    pub renderer: &'a dyn Renderer,
}

impl<'a> ViewContext<'a> {
    /// Bundle the three collaborators.
    pub fn new(
        document: &'a dyn Document,
        folding: &'a dyn Folding,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self {
            document,
            folding,
            renderer,
        }
    }

    /// Number of display lines.
    pub fn display_line_count(&self) -> usize {
        self.folding.visible_line_count().max(1)
    }

    /// Last display line.
    pub fn last_display_line(&self) -> usize {
        self.display_line_count() - 1
    }

    /// Length of the real line shown at display line `line`.
    pub fn display_line_length(&self, line: usize) -> usize {
        self.document
            .line_length(self.folding.visible_line_to_line(line))
    }

    /// End of the document in display coordinates.
    pub fn display_end(&self) -> DisplayPosition {
        let last = self.last_display_line();
        DisplayPosition::new(last, self.display_line_length(last))
    }

    /// Clamp a real position into the document.
    pub fn clamp(&self, pos: Position) -> Position {
        self.document.clamp_position(pos)
    }
}
