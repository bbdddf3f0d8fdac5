#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

/// One rendered message: who said it and what they said.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sender: String,
    pub text: String,
}

/// Ordered, append-only log of chat entries.
///
/// Entries are never reordered, deduplicated or removed; the only mutation
/// is [`HistoryLog::append`].
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn append(&mut self, sender: &str, text: &str) {
        self.entries.push(HistoryEntry {
            sender: sender.to_owned(),
            text: text.to_owned(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended after the first `seen`, for front ends that print
    /// incrementally.
    #[must_use]
    pub fn since(&self, seen: usize) -> &[HistoryEntry] {
        self.entries.get(seen..).unwrap_or_default()
    }
}
