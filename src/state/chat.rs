#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::time::{Duration, Instant};

use crate::state::history::HistoryLog;

/// Everything the chat surface shows.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    pub input: InputField,
    pub history: HistoryLog,
    pub loading: LoadingIndicator,
    pub connection: ConnectionStatus,
    /// Transient status line (server status, reply timeout).
    pub notice: Option<String>,
    pub scroll: HistoryScroll,
}

/// WebSocket connection status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Value of the single-line text field. Editing happens at the end of the line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputField {
    value: String,
}

impl InputField {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: &str) {
        value.clone_into(&mut self.value);
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn insert(&mut self, ch: char) {
        self.value.push(ch);
    }

    pub fn insert_str(&mut self, text: &str) {
        self.value.push_str(text);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }
}

/// Two-state "awaiting a reply" flag. Remembers when it was shown so an
/// optional reply timeout can clear it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadingIndicator {
    shown_at: Option<Instant>,
}

impl LoadingIndicator {
    pub fn show(&mut self, now: Instant) {
        self.shown_at = Some(now);
    }

    pub fn hide(&mut self) {
        self.shown_at = None;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.shown_at.is_some()
    }

    /// How long the indicator has been visible, if it is.
    #[must_use]
    pub fn visible_for(&self, now: Instant) -> Option<Duration> {
        self.shown_at.map(|at| now.saturating_duration_since(at))
    }
}

/// History viewport position, in display rows above the newest row.
/// Zero keeps the newest entry in view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryScroll {
    offset: usize,
}

impl HistoryScroll {
    #[must_use]
    pub fn offset(self) -> usize {
        self.offset
    }

    pub fn pin_to_newest(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
    }

    /// Keep the offset within the rows that exist above the viewport.
    pub fn clamp(&mut self, max_offset: usize) {
        self.offset = self.offset.min(max_offset);
    }
}
