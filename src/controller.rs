//! Chat controller: binds the surface controls to the send operation and
//! applies transport events to the chat state.
//!
//! DESIGN
//! ======
//! The controller owns the [`ChatState`] and an [`Emitter`]. It never draws;
//! front ends project `state()` after every event. Every entry point takes
//! `now` explicitly so the reply timeout can be driven from tests.
//!
//! SEND ORDER
//! ==========
//! 1. emit `send_message` with the trimmed text and project id
//! 2. render the text under `You`
//! 3. clear the input field
//! 4. show the loading indicator
//!
//! Sending is optimistic; nothing waits for the server. Any later
//! `receive_message` hides the loading indicator, whichever send caused it.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::net::events::{
    Emitter, RECEIVE_MESSAGE, RECEIVE_STATUS, ReceiveMessage, ReceiveStatus, SEND_MESSAGE,
    SendMessage, TransportEvent,
};
use crate::session::SessionContext;
use crate::state::chat::{ChatState, ConnectionStatus};
use crate::ui::surface::{ControlId, InputEvent, Key, Propagation, Surface};

/// Sender label for messages typed locally.
pub const SELF_LABEL: &str = "You";
/// Sender label for replies from the server.
pub const REPLY_LABEL: &str = "ChatGPT";

pub struct ChatController<E> {
    session: SessionContext,
    emitter: E,
    state: ChatState,
    reply_timeout: Option<Duration>,
    bound: bool,
}

impl<E: Emitter> ChatController<E> {
    #[must_use]
    pub fn new(session: SessionContext, emitter: E, reply_timeout: Option<Duration>) -> Self {
        Self {
            session,
            emitter,
            state: ChatState::default(),
            reply_timeout,
            bound: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChatState {
        &mut self.state
    }

    #[must_use]
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Give the connection handle back, e.g. to shut it down.
    pub fn into_emitter(self) -> E {
        self.emitter
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Attach the input handlers once the surface has been laid out.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingControl`] naming the first required
    /// control the surface does not provide.
    pub fn bind(&mut self, surface: &Surface) -> Result<(), ClientError> {
        if let Some(missing) = ControlId::REQUIRED
            .into_iter()
            .find(|id| !surface.contains(*id))
        {
            return Err(ClientError::MissingControl(missing.element_id()));
        }
        self.bound = true;
        debug!("input controls bound");
        Ok(())
    }

    /// Route an input event. Before [`bind`](Self::bind) nothing is handled.
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> Propagation {
        if !self.bound {
            return Propagation::Continue;
        }

        match event {
            InputEvent::Click { target: ControlId::SendButton } => {
                self.send(now);
                Propagation::Continue
            }
            InputEvent::KeyPress { target: ControlId::UserInput, key: Key::Enter } => {
                self.send(now);
                Propagation::Stop
            }
            _ => Propagation::Continue,
        }
    }

    /// Send the current input value. Empty or whitespace-only input is a no-op.
    pub fn send(&mut self, now: Instant) {
        let text = self.state.input.value().trim().to_owned();
        if text.is_empty() {
            return;
        }

        let payload = SendMessage {
            message: text.clone(),
            project_id: self.session.project_id().clone(),
        };
        match serde_json::to_value(&payload) {
            Ok(data) => {
                if self.emitter.emit(SEND_MESSAGE, data) {
                    debug!(chars = text.chars().count(), "message emitted");
                } else {
                    warn!("connection handle closed; message not delivered");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode send_message payload"),
        }

        self.render(SELF_LABEL, &text);
        self.state.input.clear();
        self.state.loading.show(now);
        self.state.notice = None;
    }

    /// Apply something the transport observed.
    pub fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => self.state.connection = ConnectionStatus::Connecting,
            TransportEvent::Connected { .. } => self.state.connection = ConnectionStatus::Connected,
            TransportEvent::Disconnected { reason } => {
                debug!(%reason, "connection lost");
                self.state.connection = ConnectionStatus::Disconnected;
            }
            TransportEvent::Event { name, data } => match name.as_str() {
                RECEIVE_MESSAGE => {
                    let payload = serde_json::from_value::<ReceiveMessage>(data).unwrap_or_else(|e| {
                        warn!(error = %e, "malformed receive_message payload");
                        ReceiveMessage::default()
                    });
                    self.on_receive_message(&payload);
                }
                RECEIVE_STATUS => {
                    let payload = serde_json::from_value::<ReceiveStatus>(data).unwrap_or_else(|e| {
                        warn!(error = %e, "malformed receive_status payload");
                        ReceiveStatus::default()
                    });
                    self.on_receive_status(&payload);
                }
                other => debug!(event = other, "ignoring server event"),
            },
        }
    }

    /// Render a non-empty reply, then hide the loading indicator regardless.
    pub fn on_receive_message(&mut self, payload: &ReceiveMessage) {
        if let Some(message) = payload.message.as_deref().filter(|m| !m.is_empty()) {
            self.render(REPLY_LABEL, message);
        }
        self.state.loading.hide();
    }

    /// The server gave up on the request; stop waiting and say why.
    pub fn on_receive_status(&mut self, payload: &ReceiveStatus) {
        self.state.loading.hide();
        if let Some(status) = payload.status.as_deref().filter(|s| !s.is_empty()) {
            info!(%status, "server status");
            self.state.notice = Some(status.to_owned());
        }
    }

    /// Append one entry and bring it into view.
    pub fn render(&mut self, sender: &str, text: &str) {
        self.state.history.append(sender, text);
        self.state.scroll.pin_to_newest();
    }

    /// Expire the loading indicator when a reply timeout is configured.
    pub fn tick(&mut self, now: Instant) {
        let Some(limit) = self.reply_timeout else {
            return;
        };
        let Some(waited) = self.state.loading.visible_for(now) else {
            return;
        };
        if waited >= limit {
            warn!(timeout_secs = limit.as_secs(), "no reply before timeout");
            self.state.loading.hide();
            self.state.notice = Some(format!("No reply after {}s", limit.as_secs()));
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
