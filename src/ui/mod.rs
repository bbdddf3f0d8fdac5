//! Front ends. Both drive the same [`ChatController`](crate::controller::ChatController);
//! `tui` draws an interactive ratatui surface, `line` reads stdin and prints.

pub mod line;
pub mod render;
pub mod surface;
pub mod tui;
