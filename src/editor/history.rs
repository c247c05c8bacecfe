use crate::storage::ImageSource;
use crate::surface::Surface;

/// Everything needed to restore the session to the point before one
/// destructive operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub surface: Surface,
    pub source: ImageSource,
}

impl UndoEntry {
    pub fn new(surface: Surface, source: ImageSource) -> Self {
        Self { surface, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    Applied,
    Empty,
}

impl HistoryOutcome {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Applied => "undo applied",
            Self::Empty => "undo stack empty",
        }
    }
}

/// Unbounded LIFO of snapshots. Entries share pixel buffers with the live
/// surface until either side is written.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    entries: Vec<UndoEntry>,
}

impl EditHistory {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
        tracing::debug!(depth = self.entries.len(), "recorded undo snapshot");
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        let entry = self.entries.pop();
        let outcome = if entry.is_some() {
            HistoryOutcome::Applied
        } else {
            HistoryOutcome::Empty
        };
        tracing::debug!(depth = self.entries.len(), "{}", outcome.message());
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(width: u32) -> UndoEntry {
        UndoEntry::new(
            Surface::blank(width, 1),
            ImageSource::Url(format!("http://example.invalid/{width}.jpg")),
        )
    }

    #[test]
    fn pop_returns_entries_in_reverse_order() {
        let mut history = EditHistory::new();
        history.record(entry(1));
        history.record(entry(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.pop().map(|entry| entry.surface.width()), Some(2));
        assert_eq!(history.pop().map(|entry| entry.surface.width()), Some(1));
        assert!(history.pop().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn outcome_messages_match_status_text() {
        assert_eq!(HistoryOutcome::Applied.message(), "undo applied");
        assert_eq!(HistoryOutcome::Empty.message(), "undo stack empty");
    }
}
