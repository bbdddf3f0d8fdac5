//! Error taxonomy for the chat client.

/// Errors raised during setup and by the transport.
///
/// Transport errors never reach the controller; the socket task logs them and
/// reconnects. Setup errors end the process.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    InvalidServerUrl(String),
    #[error("required control `{0}` is missing from the surface")]
    MissingControl(&'static str),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("packet decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("no ping from server within {0} ms")]
    HeartbeatTimeout(u64),
    #[error("server rejected namespace connect: {0}")]
    ConnectRejected(String),
    #[error("unexpected packet during {stage}: {packet}")]
    UnexpectedPacket { stage: &'static str, packet: String },
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and write failures on an established socket. Failures while opening
/// it are mapped to [`ClientError::WsConnect`] at the call site.
impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
