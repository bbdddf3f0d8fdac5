//! Interactive terminal front end.
//!
//! Layout, top to bottom: the history panel (its border carries the
//! connection banner), a one-row loading/notice line, then the text field with
//! the Send button beside it. The text field always has keyboard focus.
//!
//! A blocking reader thread forwards terminal events over a channel; the main
//! task `select!`s over terminal input, transport events and a tick that
//! drives the reply timeout, redrawing after each.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Alignment, Constraint, Layout, Position};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ClientConfig;
use crate::controller::ChatController;
use crate::error::ClientError;
use crate::net::events::{Emitter, TransportEvent};
use crate::net::socket::spawn_socket;
use crate::state::chat::ChatState;
use crate::ui::render::{history_lines, sanitize_text, wrap_to_width};
use crate::ui::surface::{ControlId, InputEvent, Key, Propagation, Surface, apply_default};

const TICK: Duration = Duration::from_millis(250);
const INPUT_POLL: Duration = Duration::from_millis(100);
const WHEEL_ROWS: usize = 3;
const BUTTON_WIDTH: u16 = 10;

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Restores the terminal on drop, including on early returns.
struct TerminalGuard;

impl TerminalGuard {
    fn activate() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = disable_raw_mode();
    }
}

/// Run the interactive client until the user quits.
///
/// # Errors
///
/// Returns terminal I/O errors and [`ClientError::MissingControl`] if the
/// first layout does not produce every required control.
pub async fn run(config: &ClientConfig) -> Result<(), ClientError> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let socket = spawn_socket(config.socket_url.clone(), config.namespace.clone(), events_tx);
    let mut controller = ChatController::new(config.session.clone(), socket, config.reply_timeout);

    let result = {
        let _guard = TerminalGuard::activate()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        spawn_input_reader(input_tx);
        event_loop(&mut terminal, &mut controller, &mut events_rx, &mut input_rx).await
    };

    controller.into_emitter().shutdown().await;
    result
}

async fn event_loop<B: Backend, E: Emitter>(
    terminal: &mut Terminal<B>,
    controller: &mut ChatController<E>,
    events_rx: &mut mpsc::UnboundedReceiver<TransportEvent>,
    input_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<(), ClientError> {
    let mut surface = Surface::default();
    let mut page_rows = 1;
    let mut ticker = tokio::time::interval(TICK);

    loop {
        terminal.draw(|frame| {
            (surface, page_rows) = draw(frame, controller.state_mut());
        })?;
        if !controller.is_bound() {
            controller.bind(&surface)?;
        }

        tokio::select! {
            input = input_rx.recv() => {
                let Some(event) = input else {
                    return Err(ClientError::Io(io::Error::other("terminal input reader stopped")));
                };
                if handle_terminal_event(controller, &surface, event, page_rows) == Flow::Quit {
                    return Ok(());
                }
            }
            Some(event) = events_rx.recv() => controller.handle_transport(event),
            _ = ticker.tick() => controller.tick(Instant::now()),
        }
    }
}

/// Forward terminal events from a blocking thread. Stops once the receiver
/// is gone or the terminal errors.
fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>) {
    thread::spawn(move || {
        loop {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "terminal read failed");
                        break;
                    }
                },
                Ok(false) => {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "terminal poll failed");
                    break;
                }
            }
        }
    });
}

// =============================================================================
// INPUT
// =============================================================================

fn handle_terminal_event<E: Emitter>(
    controller: &mut ChatController<E>,
    surface: &Surface,
    event: Event,
    page_rows: usize,
) -> Flow {
    match event {
        Event::Key(key) => {
            if key.kind == KeyEventKind::Release {
                return Flow::Continue;
            }
            if is_quit(&key) {
                return Flow::Quit;
            }
            if let Some(key) = map_key(&key) {
                dispatch(
                    controller,
                    InputEvent::KeyPress { target: ControlId::UserInput, key },
                    page_rows,
                );
            }
        }
        Event::Mouse(mouse) => {
            let target = surface.hit(mouse.column, mouse.row);
            match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    if let Some(target) = target {
                        dispatch(controller, InputEvent::Click { target }, page_rows);
                    }
                }
                MouseEventKind::ScrollUp if target == Some(ControlId::History) => {
                    controller.state_mut().scroll.scroll_up(WHEEL_ROWS);
                }
                MouseEventKind::ScrollDown if target == Some(ControlId::History) => {
                    controller.state_mut().scroll.scroll_down(WHEEL_ROWS);
                }
                _ => {}
            }
        }
        Event::Paste(text) => {
            let single_line = sanitize_text(&text).replace('\n', " ");
            controller.state_mut().input.insert_str(&single_line);
        }
        _ => {}
    }
    Flow::Continue
}

fn dispatch<E: Emitter>(controller: &mut ChatController<E>, event: InputEvent, page_rows: usize) {
    if controller.handle_input(event, Instant::now()) == Propagation::Continue {
        apply_default(controller.state_mut(), event, page_rows);
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn map_key(key: &KeyEvent) -> Option<Key> {
    match key.code {
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::PageUp => Some(Key::PageUp),
        KeyCode::PageDown => Some(Key::PageDown),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Char(ch)),
        _ => None,
    }
}

// =============================================================================
// DRAW
// =============================================================================

/// Draw the chat surface and report where each control landed, plus the
/// number of history rows per page.
fn draw(frame: &mut Frame, state: &mut ChatState) -> (Surface, usize) {
    let [history_area, loading_area, input_row] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());
    let [input_area, button_area] =
        Layout::horizontal([Constraint::Min(4), Constraint::Length(BUTTON_WIDTH)]).areas(input_row);

    // History, pinned to the newest row unless scrolled.
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" history · {} ", state.connection.label()));
    let inner = block.inner(history_area);
    let rows = wrap_to_width(history_lines(state.history.entries()), usize::from(inner.width));
    let visible = usize::from(inner.height);
    let max_offset = rows.len().saturating_sub(visible);
    state.scroll.clamp(max_offset);
    let top = max_offset - state.scroll.offset();
    let shown: Vec<Line<'static>> = rows.into_iter().skip(top).take(visible).collect();
    frame.render_widget(Paragraph::new(shown).block(block), history_area);

    // Loading indicator, or the latest notice when idle.
    let status = if state.loading.is_visible() {
        Line::styled(
            "waiting for reply…",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        )
    } else if let Some(notice) = &state.notice {
        Line::styled(sanitize_text(notice), Style::default().fg(Color::Yellow))
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(status), loading_area);

    // Text field shows the tail of the value when it overflows.
    let field = Block::default().borders(Borders::ALL).title(" message ");
    let field_inner = field.inner(input_area);
    let width = usize::from(field_inner.width.saturating_sub(1));
    let value = state.input.value();
    let skip = value.chars().count().saturating_sub(width);
    let tail: String = value.chars().skip(skip).collect();
    let cursor_x = field_inner.x + u16::try_from(tail.chars().count()).unwrap_or(field_inner.width);
    frame.render_widget(Paragraph::new(tail).block(field), input_area);
    frame.set_cursor_position(Position::new(cursor_x, field_inner.y));

    frame.render_widget(
        Paragraph::new("Send")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        button_area,
    );

    let mut surface = Surface::default();
    surface.place(ControlId::History, history_area);
    surface.place(ControlId::Loading, loading_area);
    surface.place(ControlId::UserInput, input_area);
    surface.place(ControlId::SendButton, button_area);
    (surface, visible)
}

#[cfg(test)]
#[path = "tui_test.rs"]
mod tests;
