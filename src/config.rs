//! Command-line and environment configuration.
//!
//! Flags fall back to environment variables, and a `.env` file in the working
//! directory is loaded before parsing, so a project can pin its server URL and
//! project id without retyping them.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ClientError;
use crate::session::SessionContext;

/// Path the Socket.IO server listens on for Engine.IO v4 WebSocket sessions.
const SOCKET_IO_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

#[derive(Parser, Debug)]
#[command(name = "chat-client", about = "Terminal chat client for a project conversation server")]
pub struct Cli {
    /// Base URL of the chat server; `http` maps to `ws`, `https` to `wss`.
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://127.0.0.1:5000")]
    pub server_url: String,

    /// Project the conversation belongs to. Parsed as JSON when possible.
    #[arg(long, env = "CHAT_PROJECT_ID")]
    pub project_id: String,

    #[arg(long, env = "CHAT_NAMESPACE", default_value = frames::DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Hide the loading indicator if no reply arrives within this many seconds.
    #[arg(long, env = "CHAT_REPLY_TIMEOUT_SECS")]
    pub reply_timeout_secs: Option<u64>,

    #[arg(long, env = "CHAT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Read messages line by line from stdin instead of the interactive UI.
    #[arg(long, default_value_t = false)]
    pub plain: bool,
}

/// Which front end drives the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Line,
}

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub socket_url: String,
    pub namespace: String,
    pub session: SessionContext,
    pub reply_timeout: Option<Duration>,
    pub log_file: Option<PathBuf>,
    pub mode: Mode,
}

impl ClientConfig {
    /// Load `.env`, parse flags and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidServerUrl`] when the server URL has an
    /// unsupported scheme or no host.
    pub fn load() -> Result<Self, ClientError> {
        // A missing .env file is the common case.
        let _ = dotenvy::dotenv();
        Self::try_from(Cli::parse())
    }
}

impl TryFrom<Cli> for ClientConfig {
    type Error = ClientError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let namespace = if cli.namespace.starts_with('/') {
            cli.namespace
        } else {
            format!("/{}", cli.namespace)
        };

        Ok(Self {
            socket_url: socket_url(&cli.server_url)?,
            namespace,
            session: SessionContext::parse(&cli.project_id),
            reply_timeout: cli
                .reply_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_file: cli.log_file,
            mode: if cli.plain { Mode::Line } else { Mode::Interactive },
        })
    }
}

/// Derive the Socket.IO WebSocket endpoint from the server's base URL,
/// keeping its host and port and choosing `ws`/`wss` from its scheme.
///
/// # Errors
///
/// Returns [`ClientError::InvalidServerUrl`] for unknown schemes or an empty host.
pub fn socket_url(base_url: &str) -> Result<String, ClientError> {
    let base_url = base_url.trim();
    let (scheme, rest) = if let Some(rest) = base_url.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = base_url.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = base_url.strip_prefix("ws://") {
        ("ws", rest)
    } else if let Some(rest) = base_url.strip_prefix("wss://") {
        ("wss", rest)
    } else {
        return Err(ClientError::InvalidServerUrl(base_url.to_owned()));
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ClientError::InvalidServerUrl(base_url.to_owned()));
    }

    Ok(format!("{scheme}://{authority}{SOCKET_IO_PATH}"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
