//! Pure projection of the history log into display lines.
//!
//! Message text is treated as plain text. Terminal control characters,
//! including whole ANSI escape sequences, are removed so a message cannot move
//! the cursor, recolor the screen or retitle the terminal.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::state::history::HistoryEntry;

/// Display lines for one entry: bold `Sender: ` then the text. Embedded
/// newlines continue on following lines.
#[must_use]
pub fn entry_lines(entry: &HistoryEntry) -> Vec<Line<'static>> {
    let text = sanitize_text(&entry.text);
    let mut rows = text.split('\n');

    let first = rows.next().unwrap_or_default().to_owned();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{}: ", sanitize_text(&entry.sender)),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(first),
    ])];
    lines.extend(rows.map(|row| Line::from(row.to_owned())));
    lines
}

/// Lines for the whole log, oldest first.
#[must_use]
pub fn history_lines(entries: &[HistoryEntry]) -> Vec<Line<'static>> {
    entries.iter().flat_map(entry_lines).collect()
}

/// Hard-wrap lines to `width` columns, keeping span styles. Each character
/// counts as one column.
#[must_use]
pub fn wrap_to_width(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows = Vec::with_capacity(lines.len());

    for line in lines {
        let mut row: Vec<Span<'static>> = Vec::new();
        let mut used = 0;
        for span in line.spans {
            let style = span.style;
            let mut chunk = String::new();
            for ch in span.content.chars() {
                if used == width {
                    if !chunk.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut chunk), style));
                    }
                    rows.push(Line::from(std::mem::take(&mut row)));
                    used = 0;
                }
                chunk.push(ch);
                used += 1;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, style));
            }
        }
        rows.push(Line::from(row));
    }
    rows
}

/// Single-line `Sender: text` form for line mode.
#[must_use]
pub fn plain_line(entry: &HistoryEntry) -> String {
    format!("{}: {}", sanitize_text(&entry.sender), sanitize_text(&entry.text))
}

/// Strip escape sequences and control characters. Newlines survive, tabs
/// become spaces and carriage returns are dropped.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\u{1b}' => skip_escape_sequence(&mut chars),
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Consume the rest of an escape sequence after ESC: CSI (`ESC [ ... final`),
/// OSC (`ESC ] ... BEL` or `ESC ] ... ESC \`) or a single following character.
fn skip_escape_sequence(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match chars.next() {
        Some('[') => {
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            while let Some(c) = chars.next() {
                if c == '\u{7}' {
                    break;
                }
                if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
