use super::*;

use frames::Handshake;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;

type ServerStream = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let url = format!("ws://{addr}/socket.io/?EIO=4&transport=websocket");
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerStream {
    let (tcp, _) = timeout(WAIT, listener.accept())
        .await
        .expect("accept timed out")
        .expect("accept");
    tokio_tungstenite::accept_async(tcp).await.expect("ws accept")
}

async fn server_send(ws: &mut ServerStream, packet: &Packet) {
    ws.send(Message::Text(encode_packet(packet).into()))
        .await
        .expect("server send");
}

async fn server_recv_text(ws: &mut ServerStream) -> String {
    loop {
        let message = timeout(WAIT, ws.next())
            .await
            .expect("server recv timed out")
            .expect("client hung up")
            .expect("ws error");
        if let Message::Text(text) = message {
            return text.as_str().to_owned();
        }
    }
}

fn open_packet(ping_interval: u64) -> Packet {
    open_packet_with_timeout(ping_interval, 20_000)
}

fn open_packet_with_timeout(ping_interval: u64, ping_timeout: u64) -> Packet {
    Packet::Open(Handshake {
        sid: "eio-1".to_owned(),
        upgrades: Vec::new(),
        ping_interval,
        ping_timeout,
        max_payload: None,
    })
}

/// Run the server half of both handshakes.
async fn server_handshake(ws: &mut ServerStream) {
    server_handshake_with(ws, &open_packet(25_000)).await;
}

async fn server_handshake_with(ws: &mut ServerStream, open: &Packet) {
    server_send(ws, open).await;
    assert_eq!(server_recv_text(ws).await, "40");
    server_send(
        ws,
        &Packet::Connect {
            namespace: "/".to_owned(),
            data: Some(serde_json::json!({"sid": "sock-1"})),
        },
    )
    .await;
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("event timed out")
        .expect("event channel closed")
}

#[tokio::test]
async fn handshake_reports_connected_with_socket_id() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;

    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Connected { sid: Some("sock-1".to_owned()) }
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn emitted_events_reach_server_as_socket_io_frames() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;

    assert!(handle.emit(
        "send_message",
        serde_json::json!({"message": "Hello", "project_id": 3})
    ));
    assert_eq!(
        server_recv_text(&mut ws).await,
        r#"42["send_message",{"message":"Hello","project_id":3}]"#
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn events_emitted_before_connect_are_buffered() {
    let (listener, url) = listen().await;
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    assert!(handle.emit("send_message", serde_json::json!({"message": "early"})));

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    assert_eq!(
        server_recv_text(&mut ws).await,
        r#"42["send_message",{"message":"early"}]"#
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn server_events_are_forwarded_in_order() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;

    server_send(
        &mut ws,
        &Packet::event("receive_message", serde_json::json!({"message": "first"})),
    )
    .await;
    server_send(
        &mut ws,
        &Packet::event("receive_message", serde_json::json!({"message": "second"})),
    )
    .await;

    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Event {
            name: "receive_message".to_owned(),
            data: serde_json::json!({"message": "first"}),
        }
    );
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Event {
            name: "receive_message".to_owned(),
            data: serde_json::json!({"message": "second"}),
        }
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn server_pings_are_answered_with_pongs() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;

    server_send(&mut ws, &Packet::Ping(None)).await;
    assert_eq!(server_recv_text(&mut ws).await, "3");

    handle.shutdown().await;
}

#[tokio::test]
async fn connect_error_is_reported_as_disconnect_reason() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_send(&mut ws, &open_packet(25_000)).await;
    assert_eq!(server_recv_text(&mut ws).await, "40");
    server_send(
        &mut ws,
        &Packet::ConnectError {
            namespace: "/".to_owned(),
            data: serde_json::json!({"message": "Not authorized"}),
        },
    )
    .await;

    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    let TransportEvent::Disconnected { reason } = next_event(&mut events_rx).await else {
        panic!("expected disconnect");
    };
    assert!(reason.contains("Not authorized"), "reason was {reason}");

    handle.shutdown().await;
}

#[tokio::test]
async fn server_disconnect_triggers_reconnect() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;

    server_send(&mut ws, &Packet::Disconnect { namespace: "/".to_owned() }).await;
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Disconnected { reason: "closed by server".to_owned() }
    );
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Connected { sid: Some("sock-1".to_owned()) }
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn missing_pings_end_the_connection() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake_with(&mut ws, &open_packet_with_timeout(100, 100)).await;
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    assert!(matches!(next_event(&mut events_rx).await, TransportEvent::Connected { .. }));

    assert_eq!(
        next_event(&mut events_rx).await,
        TransportEvent::Disconnected { reason: "no ping from server within 200 ms".to_owned() }
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_flushes_queued_events_then_disconnects() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;

    assert!(handle.emit("send_message", serde_json::json!({"message": "last"})));
    handle.shutdown().await;

    assert_eq!(
        server_recv_text(&mut ws).await,
        r#"42["send_message",{"message":"last"}]"#
    );
    assert_eq!(server_recv_text(&mut ws).await, "41");
    let closing = timeout(WAIT, ws.next()).await.expect("close timed out");
    assert!(matches!(closing, None | Some(Ok(Message::Close(_)))));
}

#[tokio::test]
async fn unreachable_server_is_reported_as_connect_failure() {
    let (listener, url) = listen().await;
    drop(listener);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    let TransportEvent::Disconnected { reason } = next_event(&mut events_rx).await else {
        panic!("expected disconnect");
    };
    assert!(reason.starts_with("websocket connect failed"), "reason was {reason}");

    handle.shutdown().await;
}

#[tokio::test]
async fn dropped_session_is_reported_as_stream_error() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    let _ = next_event(&mut events_rx).await;
    let _ = next_event(&mut events_rx).await;
    drop(ws);

    let TransportEvent::Disconnected { reason } = next_event(&mut events_rx).await else {
        panic!("expected disconnect");
    };
    assert!(reason.starts_with("websocket error"), "reason was {reason}");

    handle.shutdown().await;
}

/// Above one initial delay plus full jitter, below a doubled delay.
const BACKOFF_SPLIT: Duration = Duration::from_millis(1800);

/// Waits out one reconnect delay: from the disconnect report to the next accept.
async fn reconnect_delay(
    listener: &TcpListener,
    events_rx: &mut mpsc::UnboundedReceiver<TransportEvent>,
) -> (ServerStream, Duration) {
    let TransportEvent::Disconnected { .. } = next_event(events_rx).await else {
        panic!("expected disconnect");
    };
    let started = Instant::now();
    let ws = accept(listener).await;
    (ws, started.elapsed())
}

#[tokio::test]
async fn backoff_doubles_on_failure_and_resets_after_handshake() {
    let (listener, url) = listen().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let handle = spawn_socket(url, "/".to_owned(), events_tx);

    // Connected session closed by the server: first delay is the initial backoff.
    let mut ws = accept(&listener).await;
    server_handshake(&mut ws).await;
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    assert!(matches!(next_event(&mut events_rx).await, TransportEvent::Connected { .. }));
    server_send(&mut ws, &Packet::Disconnect { namespace: "/".to_owned() }).await;
    let (ws, first) = reconnect_delay(&listener, &mut events_rx).await;
    assert!(first < BACKOFF_SPLIT, "first delay {first:?}");

    // Failed handshake: the delay doubles.
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    drop(ws);
    let (mut ws, second) = reconnect_delay(&listener, &mut events_rx).await;
    assert!(second > BACKOFF_SPLIT, "second delay {second:?}");

    // Successful handshake: back to the initial delay.
    server_handshake(&mut ws).await;
    assert_eq!(next_event(&mut events_rx).await, TransportEvent::Connecting);
    assert!(matches!(next_event(&mut events_rx).await, TransportEvent::Connected { .. }));
    server_send(&mut ws, &Packet::Disconnect { namespace: "/".to_owned() }).await;
    let (_ws, third) = reconnect_delay(&listener, &mut events_rx).await;
    assert!(third < BACKOFF_SPLIT, "third delay {third:?}");

    handle.shutdown().await;
}
