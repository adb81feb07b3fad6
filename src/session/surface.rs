//! The controller's view of the text widget.

/// Text display and selection widget the controller drives.
///
/// All positions are char indices into [`document_text`](Self::document_text).
/// Selecting a range is also how the spoken word is highlighted.
pub trait PresentationSurface {
    /// Full document text.
    fn document_text(&self) -> &str;

    /// Start of the current selection, or `None` when there is no cursor.
    fn selection_start(&self) -> Option<usize>;

    /// Move the cursor to `start` with an empty selection.
    fn set_selection_start(&mut self, start: usize);

    /// Select `len` chars starting at `start`.
    fn select(&mut self, start: usize, len: usize);

    /// Give keyboard focus to the start/pause control.
    fn focus_start_control(&mut self);

    /// Put the cursor back at the start of the document.
    fn reset_selection(&mut self) {
        self.set_selection_start(0);
        self.select(0, 0);
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface  (test-only)
// ---------------------------------------------------------------------------

/// In-memory surface that remembers the last selection.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub text: String,
    pub cursor: Option<usize>,
    pub selection: (usize, usize),
    pub selections: Vec<(usize, usize)>,
    pub focus_requests: usize,
}

#[cfg(test)]
impl RecordingSurface {
    pub fn new(text: &str, cursor: Option<usize>) -> Self {
        Self {
            text: text.to_string(),
            cursor,
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl PresentationSurface for RecordingSurface {
    fn document_text(&self) -> &str {
        &self.text
    }

    fn selection_start(&self) -> Option<usize> {
        self.cursor
    }

    fn set_selection_start(&mut self, start: usize) {
        self.cursor = Some(start);
        self.selection = (start, 0);
    }

    fn select(&mut self, start: usize, len: usize) {
        self.cursor = Some(start);
        self.selection = (start, len);
        self.selections.push((start, len));
    }

    fn focus_start_control(&mut self) {
        self.focus_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_selection_moves_to_document_start() {
        let mut surface = RecordingSurface::new("Hello world", Some(6));
        surface.select(6, 5);

        surface.reset_selection();

        assert_eq!(surface.selection_start(), Some(0));
        assert_eq!(surface.selection, (0, 0));
    }
}
