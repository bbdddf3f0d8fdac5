//! Line-oriented front end for pipes and dumb terminals.
//!
//! Each stdin line is typed into the input field and submitted with Enter,
//! exactly as in the interactive UI. History entries go to stdout as
//! `Sender: text`; connection changes, the loading indicator and notices go to
//! stderr in brackets. After stdin ends the client keeps running until every
//! send has been answered by `receive_message` or `receive_status`, or the
//! reply timeout passes with no send or answer.
//!
//! The server broadcasts replies to the whole namespace, so a reply to another
//! client's request also counts as an answer.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ClientConfig;
use crate::controller::ChatController;
use crate::error::ClientError;
use crate::net::events::{Emitter, RECEIVE_MESSAGE, RECEIVE_STATUS, TransportEvent};
use crate::net::socket::spawn_socket;
use crate::state::chat::{ChatState, ConnectionStatus};
use crate::ui::render::{plain_line, sanitize_text};
use crate::ui::surface::{ControlId, InputEvent, Key, Surface};

const TICK: Duration = Duration::from_millis(250);

/// Run the line-mode client until stdin is exhausted and every send is answered.
///
/// # Errors
///
/// Returns stdio errors.
pub async fn run(config: &ClientConfig) -> Result<(), ClientError> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let socket = spawn_socket(config.socket_url.clone(), config.namespace.clone(), events_tx);
    let mut controller = ChatController::new(config.session.clone(), socket, config.reply_timeout);
    controller.bind(&headless_surface())?;

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let result = drive(
        &mut controller,
        &mut events_rx,
        config.reply_timeout,
        lines,
        &mut io::stdout(),
        &mut io::stderr(),
    )
    .await;

    controller.into_emitter().shutdown().await;
    result
}

/// Every control present, none clickable.
fn headless_surface() -> Surface {
    let mut surface = Surface::default();
    for id in ControlId::REQUIRED {
        surface.place(id, Rect::default());
    }
    surface
}

async fn drive<E, R, O, S>(
    controller: &mut ChatController<E>,
    events_rx: &mut mpsc::UnboundedReceiver<TransportEvent>,
    reply_timeout: Option<Duration>,
    mut lines: Lines<R>,
    out: &mut O,
    status: &mut S,
) -> Result<(), ClientError>
where
    E: Emitter,
    R: AsyncBufRead + Unpin,
    O: Write,
    S: Write,
{
    let mut printer = Printer::default();
    let mut ticker = tokio::time::interval(TICK);
    let mut stdin_open = true;
    // Sends still waiting for an answer, and when the count last moved.
    let mut pending: usize = 0;
    let mut progress = Instant::now();

    loop {
        printer.flush(controller.state(), out, status)?;
        if !stdin_open && pending == 0 {
            return Ok(());
        }

        tokio::select! {
            biased;
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if submit(controller, &line) {
                        pending += 1;
                        progress = Instant::now();
                    }
                }
                None => stdin_open = false,
            },
            Some(event) = events_rx.recv() => {
                if is_answer(&event) {
                    pending = pending.saturating_sub(1);
                    progress = Instant::now();
                }
                controller.handle_transport(event);
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                controller.tick(now);
                if pending > 0 && reply_timeout.is_some_and(|limit| now.duration_since(progress) >= limit) {
                    warn!(pending, "no reply before timeout; giving up on outstanding sends");
                    pending = 0;
                }
            }
        }
    }
}

/// Type `line` into the input field and press Enter. Returns whether a
/// message went out.
fn submit<E: Emitter>(controller: &mut ChatController<E>, line: &str) -> bool {
    let before = controller.state().history.len();
    controller.state_mut().input.set(line);
    controller.handle_input(
        InputEvent::KeyPress { target: ControlId::UserInput, key: Key::Enter },
        Instant::now(),
    );
    controller.state().history.len() > before
}

fn is_answer(event: &TransportEvent) -> bool {
    matches!(event, TransportEvent::Event { name, .. } if name == RECEIVE_MESSAGE || name == RECEIVE_STATUS)
}

/// Prints whatever changed in the chat state since the last flush.
#[derive(Debug, Default)]
struct Printer {
    printed: usize,
    connection: ConnectionStatus,
    loading: bool,
    notice: Option<String>,
}

impl Printer {
    fn flush(&mut self, state: &ChatState, out: &mut impl Write, status: &mut impl Write) -> io::Result<()> {
        for entry in state.history.since(self.printed) {
            writeln!(out, "{}", plain_line(entry))?;
        }
        self.printed = state.history.len();
        out.flush()?;

        if state.connection != self.connection {
            writeln!(status, "[{}]", state.connection.label())?;
            self.connection = state.connection;
        }
        let loading = state.loading.is_visible();
        if loading && !self.loading {
            writeln!(status, "[waiting for reply…]")?;
        }
        self.loading = loading;
        if state.notice != self.notice {
            if let Some(notice) = &state.notice {
                writeln!(status, "[{}]", sanitize_text(notice))?;
            }
            self.notice.clone_from(&state.notice);
        }
        status.flush()
    }
}

#[cfg(test)]
#[path = "line_test.rs"]
mod tests;
