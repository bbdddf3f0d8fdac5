//! # chat-client
//!
//! Terminal client for a project-scoped chat server speaking Socket.IO.
//!
//! The user types a message, it is emitted as `send_message` with the
//! project id, echoed locally under `You`, and a loading indicator shows
//! until the server's `receive_message` reply arrives under `ChatGPT`.
//!
//! Layers, bottom up: the `frames` crate encodes Engine.IO/Socket.IO text
//! packets, [`net`] owns the WebSocket, [`state`] and [`controller`] hold the
//! chat semantics, and [`ui`] projects them onto a terminal.

pub mod config;
pub mod controller;
pub mod error;
pub mod net;
pub mod session;
pub mod state;
pub mod ui;
