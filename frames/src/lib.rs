//! Shared packet model and text codec for the realtime WS transport.
//!
//! The chat server speaks Socket.IO (v5) layered on Engine.IO (v4). Over a
//! WebSocket every text frame carries exactly one Engine.IO packet; Engine.IO
//! `message` packets in turn carry one Socket.IO packet. This crate flattens
//! both layers into a single [`Packet`] enum so the transport can match on
//! what actually arrived without juggling two decoders.
//!
//! Binary attachments (Socket.IO `BINARY_EVENT` / `BINARY_ACK`) are not
//! supported; the chat protocol never uses them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace used when a packet carries no explicit `/ns,` prefix.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Error returned by [`decode_packet`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame (or the Engine.IO message body) was empty.
    #[error("empty packet")]
    Empty,
    /// The first character is not a known Engine.IO packet type.
    #[error("unknown engine.io packet type: {0:?}")]
    UnknownEngineType(char),
    /// The Socket.IO packet type inside an Engine.IO message is not known.
    #[error("unknown socket.io packet type: {0:?}")]
    UnknownSocketType(char),
    /// `BINARY_EVENT` and `BINARY_ACK` packets need attachment reassembly.
    #[error("binary socket.io packets are not supported")]
    BinaryUnsupported,
    /// The ack id digits do not fit into a `u64`.
    #[error("invalid ack id: {0}")]
    InvalidAckId(String),
    /// An `ACK` packet arrived without an ack id.
    #[error("ack packet without ack id")]
    MissingAckId,
    /// The JSON body could not be parsed.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// An `EVENT` body is not a `[name, ...args]` array.
    #[error("malformed event: {0}")]
    MalformedEvent(&'static str),
}

/// Parameters the server announces in the Engine.IO `open` packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the session may upgrade to (empty over WebSocket).
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong before dropping the session.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// A single packet on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Engine.IO `open` (`0`), first frame sent by the server.
    Open(Handshake),
    /// Engine.IO `close` (`1`).
    Close,
    /// Engine.IO `ping` (`2`) with optional probe payload.
    Ping(Option<String>),
    /// Engine.IO `pong` (`3`) with optional probe payload.
    Pong(Option<String>),
    /// Engine.IO `upgrade` (`5`).
    Upgrade,
    /// Engine.IO `noop` (`6`).
    Noop,
    /// Socket.IO `CONNECT` (`40`). Clients send it bare; servers answer with `{"sid": ...}`.
    Connect { namespace: String, data: Option<Value> },
    /// Socket.IO `DISCONNECT` (`41`).
    Disconnect { namespace: String },
    /// Socket.IO `EVENT` (`42`): a named event with positional arguments.
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    /// Socket.IO `ACK` (`43`).
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    /// Socket.IO `CONNECT_ERROR` (`44`), typically `{"message": ...}`.
    ConnectError { namespace: String, data: Value },
}

impl Packet {
    /// Event on the default namespace carrying a single payload argument.
    #[must_use]
    pub fn event(name: &str, payload: Value) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            ack_id: None,
            name: name.to_owned(),
            args: vec![payload],
        }
    }

    /// Namespace connect request as sent by a client.
    #[must_use]
    pub fn connect(namespace: &str) -> Self {
        Self::Connect { namespace: namespace.to_owned(), data: None }
    }
}

/// Encode a packet into the text form carried by one WebSocket frame.
#[must_use]
pub fn encode_packet(packet: &Packet) -> String {
    match packet {
        Packet::Open(handshake) => {
            // Serializing a struct of strings and integers cannot fail.
            let body = serde_json::to_string(handshake).unwrap_or_default();
            format!("0{body}")
        }
        Packet::Close => "1".to_owned(),
        Packet::Ping(probe) => format!("2{}", probe.as_deref().unwrap_or_default()),
        Packet::Pong(probe) => format!("3{}", probe.as_deref().unwrap_or_default()),
        Packet::Upgrade => "5".to_owned(),
        Packet::Noop => "6".to_owned(),
        Packet::Connect { namespace, data } => {
            let mut out = socket_prefix('0', namespace, None);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
        Packet::Disconnect { namespace } => socket_prefix('1', namespace, None),
        Packet::Event { namespace, ack_id, name, args } => {
            let mut body = Vec::with_capacity(args.len() + 1);
            body.push(Value::String(name.clone()));
            body.extend(args.iter().cloned());

            let mut out = socket_prefix('2', namespace, *ack_id);
            out.push_str(&Value::Array(body).to_string());
            out
        }
        Packet::Ack { namespace, ack_id, args } => {
            let mut out = socket_prefix('3', namespace, Some(*ack_id));
            out.push_str(&Value::Array(args.clone()).to_string());
            out
        }
        Packet::ConnectError { namespace, data } => {
            let mut out = socket_prefix('4', namespace, None);
            out.push_str(&data.to_string());
            out
        }
    }
}

/// Decode the text of one WebSocket frame into a packet.
///
/// # Errors
///
/// Returns [`CodecError`] for empty frames, unknown packet types, binary
/// packets, bad ack ids and malformed JSON bodies.
pub fn decode_packet(text: &str) -> Result<Packet, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping(non_empty(rest))),
        '3' => Ok(Packet::Pong(non_empty(rest))),
        '4' => decode_socket_packet(rest),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(CodecError::UnknownEngineType(other)),
    }
}

fn decode_socket_packet(text: &str) -> Result<Packet, CodecError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let (namespace, rest) = split_namespace(chars.as_str());
    let (ack_id, body) = split_ack_id(rest)?;

    match kind {
        '0' => Ok(Packet::Connect { namespace, data: parse_optional(body)? }),
        '1' => Ok(Packet::Disconnect { namespace }),
        '2' => {
            let (name, args) = parse_event_body(body)?;
            Ok(Packet::Event { namespace, ack_id, name, args })
        }
        '3' => {
            let ack_id = ack_id.ok_or(CodecError::MissingAckId)?;
            let args = match parse_optional(body)? {
                Some(Value::Array(args)) => args,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            Ok(Packet::Ack { namespace, ack_id, args })
        }
        '4' => Ok(Packet::ConnectError {
            namespace,
            data: parse_optional(body)?.unwrap_or(Value::Null),
        }),
        '5' | '6' => Err(CodecError::BinaryUnsupported),
        other => Err(CodecError::UnknownSocketType(other)),
    }
}

fn socket_prefix(kind: char, namespace: &str, ack_id: Option<u64>) -> String {
    let mut out = String::from("4");
    out.push(kind);
    if namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }
    if let Some(id) = ack_id {
        out.push_str(&id.to_string());
    }
    out
}

/// Split an optional `/ns,` prefix. A namespace without a trailing comma runs
/// to the end of the packet.
fn split_namespace(text: &str) -> (String, &str) {
    if !text.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_owned(), text);
    }
    match text.split_once(',') {
        Some((namespace, rest)) => (namespace.to_owned(), rest),
        None => (text.to_owned(), ""),
    }
}

fn split_ack_id(text: &str) -> Result<(Option<u64>, &str), CodecError> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return Ok((None, text));
    }

    let digits = &text[..end];
    let id = digits
        .parse::<u64>()
        .map_err(|_| CodecError::InvalidAckId(digits.to_owned()))?;
    Ok((Some(id), &text[end..]))
}

fn parse_optional(body: &str) -> Result<Option<Value>, CodecError> {
    if body.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

fn parse_event_body(body: &str) -> Result<(String, Vec<Value>), CodecError> {
    let Value::Array(mut items) = serde_json::from_str::<Value>(body)? else {
        return Err(CodecError::MalformedEvent("body is not an array"));
    };
    if items.is_empty() {
        return Err(CodecError::MalformedEvent("missing event name"));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(CodecError::MalformedEvent("event name is not a string"));
    };
    Ok((name, items))
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() { None } else { Some(text.to_owned()) }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
