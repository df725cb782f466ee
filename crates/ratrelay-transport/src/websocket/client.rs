//! Reconnecting websocket client loop.
//!
//! The loop owns the socket; every decision (what to send on open, how long
//! to wait after a failure) belongs to the [`ConnectionHandler`].
//!
//! ```text
//! ┌──────────────▶ on_connect_start
//! │                      │
//! │          connect ────┴──── fail ──▶ on_connect_failed ──▶ wait ──┐
//! │             │                                                    │
//! │          on_open ──▶ read/write ──▶ on_close                     │
//! │                                        │                         │
//! │                   manual reconnect ◀───┼──▶ on_connection_lost   │
//! │                          │             │          │              │
//! └──────────────────────────┴─────────────┴─────── wait ◀───────────┘
//! ```
//!
//! Shutdown ends the loop from any state, including while waiting, and
//! never counts as a lost connection. A manual reconnect during the
//! handshake abandons it and starts over.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use ratrelay_core::{ConnectionHandle, ConnectionHandler, Target};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound frames queued per connection.
const SEND_QUEUE: usize = 256;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// How one connection ended.
#[derive(Debug)]
enum SessionEnd {
    /// Shutdown was requested.
    Shutdown,
    /// A manual reconnect was requested; connect again without waiting.
    Reconnect,
    /// The connection was lost.
    Lost(String),
}

// =============================================================================
// Control
// =============================================================================

/// Cloneable handle to steer a running [`WsClient`].
#[derive(Debug, Clone, Default)]
pub struct StreamControl {
    shutdown: CancellationToken,
    reconnect: Arc<Notify>,
}

impl StreamControl {
    /// Creates a control with no client attached yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the current connection (or cuts the current wait short) and
    /// connects again at once.
    pub fn reconnect(&self) {
        self.reconnect.notify_one();
    }

    /// Stops the client for good.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns true once shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Websocket client that keeps a connection to one [`Target`] alive.
pub struct WsClient {
    target: Target,
    handler: Arc<dyn ConnectionHandler>,
    control: StreamControl,
}

impl WsClient {
    /// Creates a client; nothing connects until [`run`](Self::run).
    pub fn new(target: Target, handler: Arc<dyn ConnectionHandler>) -> Self {
        Self::with_control(target, handler, StreamControl::new())
    }

    /// Creates a client steered by an existing control.
    pub fn with_control(
        target: Target,
        handler: Arc<dyn ConnectionHandler>,
        control: StreamControl,
    ) -> Self {
        Self {
            target,
            handler,
            control,
        }
    }

    /// The control steering this client.
    pub fn control(&self) -> StreamControl {
        self.control.clone()
    }

    /// Runs the loop on a new task.
    pub fn spawn(self) -> (JoinHandle<()>, StreamControl) {
        let control = self.control();
        (tokio::spawn(self.run()), control)
    }

    /// Connects, serves and reconnects until shutdown.
    pub async fn run(self) {
        let url = self.target.url();
        info!(
            url = %url,
            tls = self.target.is_secure(),
            server_name = %self.target.server_name(),
            "Starting websocket client"
        );

        while !self.control.is_shutdown() {
            self.handler.on_connect_start(&url).await;

            let connected = tokio::select! {
                biased;
                _ = self.control.shutdown.cancelled() => break,
                _ = self.control.reconnect.notified() => {
                    debug!(url = %url, "Reconnect requested during handshake, restarting");
                    continue;
                }
                result = connect_async(url.as_str()) => result,
            };

            let end = match connected {
                Ok((stream, _response)) => self.serve(stream).await,
                Err(e) => {
                    warn!(url = %url, error = %e, "Websocket connection failed");
                    let delay = self.handler.on_connect_failed(&e.to_string()).await;
                    if !self.wait(delay).await {
                        break;
                    }
                    continue;
                }
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Reconnect => continue,
                SessionEnd::Lost(_) if self.control.is_shutdown() => break,
                SessionEnd::Lost(reason) => {
                    let delay = self.handler.on_connection_lost(&reason).await;
                    if !self.wait(delay).await {
                        break;
                    }
                }
            }
        }

        info!(url = %url, "Websocket client stopped");
    }

    /// Waits out a reconnect delay. Returns false on shutdown.
    async fn wait(&self, delay: Duration) -> bool {
        debug!(delay = ?delay, "Waiting before reconnecting");
        tokio::select! {
            _ = self.control.shutdown.cancelled() => false,
            _ = self.control.reconnect.notified() => true,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Serves one open connection until it ends.
    async fn serve(&self, stream: WsStream) -> SessionEnd {
        let id = format!("ws-{}", NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed));
        let (message_tx, mut message_rx) = mpsc::channel::<Vec<u8>>(SEND_QUEUE);
        let (close_tx, mut close_rx) = watch::channel(false);
        // Held for the whole connection so neither channel closes under us.
        let handle = ConnectionHandle::new(id.clone(), message_tx, close_tx);

        let (mut ws_tx, mut ws_rx) = stream.split();
        info!(connection_id = %id, "Websocket connected");
        self.handler.on_open(handle.clone()).await;

        loop {
            tokio::select! {
                biased;

                _ = self.control.shutdown.cancelled() => {
                    info!(connection_id = %id, "Websocket client shutting down");
                    let _ = ws_tx.close().await;
                    self.handler.on_close(true, Some(1000), "shutdown").await;
                    return SessionEnd::Shutdown;
                }

                _ = self.control.reconnect.notified() => {
                    info!(connection_id = %id, "Manual reconnect requested");
                    let _ = ws_tx.close().await;
                    self.handler.on_close(true, Some(1000), "manual reconnect").await;
                    return SessionEnd::Reconnect;
                }

                changed = close_rx.changed() => {
                    if changed.is_err() || *close_rx.borrow_and_update() {
                        info!(connection_id = %id, "Connection closed by handler");
                        let _ = ws_tx.close().await;
                        self.handler.on_close(true, Some(1000), "closed by client").await;
                        return SessionEnd::Lost("closed by client".to_string());
                    }
                }

                Some(data) = message_rx.recv() => {
                    let msg = Message::Text(String::from_utf8_lossy(&data).into_owned().into());
                    if let Err(e) = ws_tx.send(msg).await {
                        warn!(connection_id = %id, error = %e, "Failed to send message");
                    }
                }

                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        trace!(connection_id = %id, len = text.len(), "Received text");
                        self.handler.on_message(text.as_bytes(), false).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        trace!(connection_id = %id, len = data.len(), "Received binary");
                        self.handler.on_message(&data, true).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        trace!(connection_id = %id, "Received ping, sending pong");
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        trace!(connection_id = %id, "Received pong");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                            None => (None, String::new()),
                        };
                        info!(connection_id = %id, code = ?code, reason = %reason, "Server closed connection");
                        let _ = ws_tx.close().await;
                        self.handler.on_close(true, code, &reason).await;
                        let reason = if reason.is_empty() {
                            "closed by server".to_string()
                        } else {
                            reason
                        };
                        return SessionEnd::Lost(reason);
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        warn!(connection_id = %id, error = %e, "Websocket error");
                        let reason = e.to_string();
                        self.handler.on_close(false, None, &reason).await;
                        return SessionEnd::Lost(reason);
                    }
                    None => {
                        info!(connection_id = %id, "Websocket stream ended");
                        self.handler.on_close(false, None, "stream ended").await;
                        return SessionEnd::Lost("stream ended".to_string());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    /// Handler that records callbacks and reports each one on a channel.
    struct Recorder {
        events: Mutex<Vec<String>>,
        tx: mpsc::UnboundedSender<String>,
        delay: Duration,
        connection: Mutex<Option<ConnectionHandle>>,
    }

    impl Recorder {
        fn new(delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let recorder = Arc::new(Self {
                events: Mutex::new(Vec::new()),
                tx,
                delay,
                connection: Mutex::new(None),
            });
            (recorder, rx)
        }

        fn record(&self, event: String) {
            self.events.lock().push(event.clone());
            let _ = self.tx.send(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn connection(&self) -> ConnectionHandle {
            self.connection.lock().clone().unwrap()
        }
    }

    #[async_trait]
    impl ConnectionHandler for Recorder {
        async fn on_connect_start(&self, _url: &str) {
            self.record("start".into());
        }

        async fn on_open(&self, connection: ConnectionHandle) {
            connection.send(br#"{"action":"hello"}"#.to_vec()).await.unwrap();
            *self.connection.lock() = Some(connection);
            self.record("open".into());
        }

        async fn on_message(&self, data: &[u8], is_binary: bool) {
            let kind = if is_binary { "binary" } else { "text" };
            self.record(format!("{kind}:{}", String::from_utf8_lossy(data)));
        }

        async fn on_close(&self, _was_clean: bool, _code: Option<u16>, reason: &str) {
            self.record(format!("close:{reason}"));
        }

        async fn on_connect_failed(&self, _reason: &str) -> Duration {
            self.record("failed".into());
            self.delay
        }

        async fn on_connection_lost(&self, _reason: &str) -> Duration {
            self.record("lost".into());
            self.delay
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<String>, wanted: &str) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = rx.recv().await {
                if event == wanted {
                    return;
                }
            }
        })
        .await
        .unwrap();
    }

    /// Accepts every connection, optionally after a delay, and drains it
    /// until the client goes away.
    fn quiet_server(listener: TcpListener, accept_delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                tokio::spawn(async move {
                    tokio::time::sleep(accept_delay).await;
                    if let Ok(mut ws) = accept_async(tcp).await {
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                });
            }
        })
    }

    #[tokio::test]
    async fn test_serves_then_reconnects_after_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(tcp).await.unwrap();
                let hello = ws.next().await.unwrap().unwrap();
                assert_eq!(hello.into_text().unwrap().as_str(), r#"{"action":"hello"}"#);
                ws.send(Message::Text(r#"{"meta":{"action":"welcome"}}"#.to_string().into()))
                    .await
                    .unwrap();
                ws.close(Some(CloseFrame {
                    code: CloseCode::Away,
                    reason: "going away".into(),
                }))
                .await
                .unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            }
        });

        let (recorder, mut rx) = Recorder::new(Duration::from_millis(10));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder.clone()).spawn();

        next_event(&mut rx, "lost").await;
        next_event(&mut rx, "open").await;
        control.shutdown();
        task.await.unwrap();
        server.abort();

        let events = recorder.events.lock().clone();
        assert_eq!(
            &events[..5],
            [
                "start",
                "open",
                r#"text:{"meta":{"action":"welcome"}}"#,
                "close:going away",
                "lost",
            ]
        );
        assert_eq!(events[5], "start");
    }

    #[tokio::test]
    async fn test_connect_failure_retries_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (recorder, mut rx) = Recorder::new(Duration::from_millis(5));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder.clone()).spawn();

        next_event(&mut rx, "failed").await;
        next_event(&mut rx, "failed").await;
        control.shutdown();
        task.await.unwrap();

        let events = recorder.events.lock().clone();
        assert!(!events.contains(&"open".to_string()));
        assert_eq!(events[0], "start");
        assert_eq!(events[1], "failed");
    }

    #[tokio::test]
    async fn test_shutdown_during_long_wait() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (recorder, mut rx) = Recorder::new(Duration::from_secs(3600));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder).spawn();

        next_event(&mut rx, "failed").await;
        control.shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_manual_reconnect_replaces_live_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = quiet_server(listener, Duration::ZERO);

        let (recorder, mut rx) = Recorder::new(Duration::from_secs(3600));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder.clone()).spawn();

        next_event(&mut rx, "open").await;
        control.reconnect();
        next_event(&mut rx, "open").await;
        control.shutdown();
        task.await.unwrap();
        server.abort();

        assert_eq!(
            recorder.events(),
            [
                "start",
                "open",
                "close:manual reconnect",
                "start",
                "open",
                "close:shutdown",
            ]
        );
    }

    #[tokio::test]
    async fn test_reconnect_during_handshake_keeps_next_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = quiet_server(listener, Duration::from_millis(300));

        let (recorder, mut rx) = Recorder::new(Duration::from_secs(3600));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder.clone()).spawn();

        next_event(&mut rx, "start").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        control.reconnect();
        next_event(&mut rx, "open").await;
        // The reconnect must not leave a pending signal for the new socket.
        tokio::time::sleep(Duration::from_millis(200)).await;
        control.shutdown();
        task.await.unwrap();
        server.abort();

        assert_eq!(
            recorder.events(),
            ["start", "start", "open", "close:shutdown"]
        );
    }

    #[tokio::test]
    async fn test_handler_close_counts_as_lost() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = quiet_server(listener, Duration::ZERO);

        let (recorder, mut rx) = Recorder::new(Duration::from_secs(3600));
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();
        let (task, control) = WsClient::new(target, recorder.clone()).spawn();

        next_event(&mut rx, "open").await;
        recorder.connection().close();
        next_event(&mut rx, "lost").await;
        control.shutdown();
        task.await.unwrap();
        server.abort();

        assert_eq!(
            recorder.events(),
            ["start", "open", "close:closed by client", "lost"]
        );
    }

    #[tokio::test]
    async fn test_shutdown_with_pending_close_is_not_lost() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = quiet_server(listener, Duration::ZERO);
        let target = Target::from_url("ws://127.0.0.1", Some(port)).unwrap();

        for _ in 0..10 {
            let (recorder, mut rx) = Recorder::new(Duration::from_secs(3600));
            let (task, control) = WsClient::new(target.clone(), recorder.clone()).spawn();

            next_event(&mut rx, "open").await;
            control.shutdown();
            recorder.connection().close();
            task.await.unwrap();

            assert_eq!(recorder.events(), ["start", "open", "close:shutdown"]);
        }
        server.abort();
    }
}
