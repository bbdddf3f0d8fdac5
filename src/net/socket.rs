//! Socket.IO connection over a WebSocket.
//!
//! DESIGN
//! ======
//! One tokio task owns the WebSocket. The front end talks to it through two
//! unbounded channels: packets to send go in via [`SocketHandle`], and
//! [`TransportEvent`]s come out. The outbound queue outlives individual
//! connections and is only drained while a namespace session is up, so
//! messages emitted during a reconnect are delivered once it succeeds.
//!
//! LIFECYCLE
//! =========
//! 1. Connect → wait for Engine.IO `open` (ping interval/timeout)
//! 2. Send namespace `CONNECT` → wait for the server's `CONNECT` → `Connected`
//! 3. `select!` over server frames, the outbound queue and the heartbeat
//!    deadline; every server ping is answered and pushes the deadline out
//! 4. Disconnect → exponential backoff with jitter → back to 1
//!
//! The loop ends when the handle is dropped or the event receiver goes away.

use std::time::Duration;

use frames::{Packet, decode_packet, encode_packet};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::net::events::{Emitter, TransportEvent};

const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
const MAX_BACKOFF: Duration = Duration::from_millis(10_000);
const MAX_JITTER_MS: u64 = 250;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// How a connection ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum RunOutcome {
    /// The server closed the session; reconnect.
    Closed,
    /// The handle or the event receiver is gone; stop.
    Shutdown,
}

// =============================================================================
// HANDLE
// =============================================================================

/// The single live connection of the process. Emitting queues a Socket.IO
/// event on the configured namespace.
pub struct SocketHandle {
    namespace: String,
    tx: mpsc::UnboundedSender<Packet>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    /// Close the session and wait briefly for the task to say goodbye to the
    /// server. A task stuck connecting or backing off is aborted.
    pub async fn shutdown(self) {
        let Self { tx, mut task, .. } = self;
        drop(tx);
        if timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            task.abort();
        }
    }
}

impl Emitter for SocketHandle {
    fn emit(&self, event: &str, data: Value) -> bool {
        let packet = Packet::Event {
            namespace: self.namespace.clone(),
            ack_id: None,
            name: event.to_owned(),
            args: vec![data],
        };
        self.tx.send(packet).is_ok()
    }
}

/// Spawn the connection task for `url` and return its handle.
pub fn spawn_socket(
    url: String,
    namespace: String,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> SocketHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(socket_loop(url, namespace.clone(), events, rx));
    SocketHandle { namespace, tx, task }
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

async fn socket_loop(
    url: String,
    namespace: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut rx: mpsc::UnboundedReceiver<Packet>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if events.send(TransportEvent::Connecting).is_err() {
            break;
        }

        let reason = match connect_and_run(&url, &namespace, &events, &mut rx, &mut backoff).await {
            Ok(RunOutcome::Shutdown) => {
                info!("socket shut down");
                let _ = events.send(TransportEvent::Disconnected { reason: "shutdown".to_owned() });
                break;
            }
            Ok(RunOutcome::Closed) => {
                info!("websocket disconnected by server");
                "closed by server".to_owned()
            }
            Err(e) => {
                warn!(error = %e, "websocket error");
                e.to_string()
            }
        };

        if events.send(TransportEvent::Disconnected { reason }).is_err() {
            break;
        }

        let delay = backoff + jitter();
        debug!(?delay, "reconnecting after backoff");
        sleep(delay).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Connect, complete both handshakes and pump frames until the session ends.
async fn connect_and_run(
    url: &str,
    namespace: &str,
    events: &mpsc::UnboundedSender<TransportEvent>,
    rx: &mut mpsc::UnboundedReceiver<Packet>,
    backoff: &mut Duration,
) -> Result<RunOutcome, ClientError> {
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::WsConnect(Box::new(e)))?;

    let handshake = match recv_packet(&mut stream, HANDSHAKE_TIMEOUT, "engine.io open").await? {
        Packet::Open(handshake) => handshake,
        other => {
            return Err(ClientError::UnexpectedPacket {
                stage: "engine.io open",
                packet: encode_packet(&other),
            });
        }
    };
    debug!(
        sid = %handshake.sid,
        ping_interval = handshake.ping_interval,
        ping_timeout = handshake.ping_timeout,
        "engine.io session opened"
    );

    send_packet(&mut stream, &Packet::connect(namespace)).await?;
    let sid = wait_for_namespace(&mut stream, namespace).await?;

    info!(sid = sid.as_deref().unwrap_or("-"), %namespace, "websocket connected");
    *backoff = INITIAL_BACKOFF;
    if events.send(TransportEvent::Connected { sid }).is_err() {
        close_session(&mut stream, namespace).await;
        return Ok(RunOutcome::Shutdown);
    }

    let heartbeat_ms = handshake.ping_interval.saturating_add(handshake.ping_timeout);
    let heartbeat = Duration::from_millis(heartbeat_ms);
    let mut deadline = Instant::now() + heartbeat;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(message) = incoming else {
                    return Ok(RunOutcome::Closed);
                };
                let text = match message? {
                    Message::Text(text) => text,
                    Message::Close(_) => return Ok(RunOutcome::Closed),
                    _ => continue,
                };
                let packet = match decode_packet(text.as_str()) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable packet");
                        continue;
                    }
                };

                match packet {
                    Packet::Ping(probe) => {
                        deadline = Instant::now() + heartbeat;
                        send_packet(&mut stream, &Packet::Pong(probe)).await?;
                    }
                    Packet::Event { namespace: ns, name, args, .. } if ns == namespace => {
                        let data = args.into_iter().next().unwrap_or(Value::Null);
                        if events.send(TransportEvent::Event { name, data }).is_err() {
                            close_session(&mut stream, namespace).await;
                            return Ok(RunOutcome::Shutdown);
                        }
                    }
                    Packet::Disconnect { namespace: ns } if ns == namespace => {
                        return Ok(RunOutcome::Closed);
                    }
                    Packet::Close => return Ok(RunOutcome::Closed),
                    Packet::ConnectError { data, .. } => {
                        return Err(ClientError::ConnectRejected(connect_error_message(&data)));
                    }
                    other => debug!(packet = %encode_packet(&other), "ignoring packet"),
                }
            }
            outbound = rx.recv() => {
                let Some(packet) = outbound else {
                    close_session(&mut stream, namespace).await;
                    return Ok(RunOutcome::Shutdown);
                };
                send_packet(&mut stream, &packet).await?;
            }
            () = sleep_until(deadline) => {
                return Err(ClientError::HeartbeatTimeout(heartbeat_ms));
            }
        }
    }
}

/// Wait for the server to accept the namespace connect; returns the socket id.
async fn wait_for_namespace(
    stream: &mut WsStream,
    namespace: &str,
) -> Result<Option<String>, ClientError> {
    let fut = async {
        loop {
            match recv_packet(stream, HANDSHAKE_TIMEOUT, "namespace connect").await? {
                Packet::Connect { namespace: ns, data } if ns == namespace => {
                    let sid = data
                        .as_ref()
                        .and_then(|d| d.get("sid"))
                        .and_then(Value::as_str)
                        .map(ToOwned::to_owned);
                    return Ok(sid);
                }
                Packet::ConnectError { data, .. } => {
                    return Err(ClientError::ConnectRejected(connect_error_message(&data)));
                }
                Packet::Ping(probe) => send_packet(stream, &Packet::Pong(probe)).await?,
                Packet::Close => return Err(ClientError::WsClosed),
                other => debug!(packet = %encode_packet(&other), "ignoring packet before connect"),
            }
        }
    };

    timeout(HANDSHAKE_TIMEOUT, fut)
        .await
        .map_err(|_| ClientError::Timeout("namespace connect"))?
}

async fn recv_packet(
    stream: &mut WsStream,
    limit: Duration,
    stage: &'static str,
) -> Result<Packet, ClientError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(ClientError::WsClosed);
            };
            match message? {
                Message::Text(text) => return decode_packet(text.as_str()).map_err(ClientError::from),
                Message::Close(_) => return Err(ClientError::WsClosed),
                _ => {}
            }
        }
    };

    timeout(limit, fut).await.map_err(|_| ClientError::Timeout(stage))?
}

async fn send_packet(stream: &mut WsStream, packet: &Packet) -> Result<(), ClientError> {
    stream.send(Message::Text(encode_packet(packet).into())).await?;
    Ok(())
}

/// Best-effort goodbye: namespace disconnect followed by a WebSocket close.
async fn close_session(stream: &mut WsStream, namespace: &str) {
    let goodbye = Packet::Disconnect { namespace: namespace.to_owned() };
    if send_packet(stream, &goodbye).await.is_ok() {
        let _ = stream.close(None).await;
    }
}

fn connect_error_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map_or_else(|| data.to_string(), ToOwned::to_owned)
}

fn jitter() -> Duration {
    Duration::from_millis(rand::rng().random_range(0..=MAX_JITTER_MS))
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;
