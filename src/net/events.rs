//! Named events exchanged with the chat server, and the emit seam.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server: user submitted text for a project.
pub const SEND_MESSAGE: &str = "send_message";
/// Server → client: the reply produced for the conversation.
pub const RECEIVE_MESSAGE: &str = "receive_message";
/// Server → client: the server failed to produce a reply.
pub const RECEIVE_STATUS: &str = "receive_status";

/// Payload of [`SEND_MESSAGE`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub message: String,
    pub project_id: Value,
}

/// Payload of [`RECEIVE_MESSAGE`]. Extra fields such as `project_id` are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiveMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of [`RECEIVE_STATUS`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiveStatus {
    #[serde(default)]
    pub status: Option<String>,
}

/// Something the transport observed, delivered to the front-end task.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Connecting,
    /// Namespace handshake completed.
    Connected { sid: Option<String> },
    /// A server event with its first argument (or `null` when it had none).
    Event { name: String, data: Value },
    Disconnected { reason: String },
}

/// Outbound half of the connection handle.
pub trait Emitter {
    /// Queue an event for the server. Returns `false` when the connection
    /// handle is closed and the event was dropped.
    fn emit(&self, event: &str, data: Value) -> bool;
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
