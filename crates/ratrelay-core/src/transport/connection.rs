//! Connection handle, lifecycle callbacks and lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::envelope::OutboundFrame;
use crate::error::{TransportError, TransportResult};

// =============================================================================
// Connection Handler
// =============================================================================

/// Receives the lifecycle callbacks of a reconnecting client connection.
///
/// The transport owns the socket and the reconnect loop; the handler owns
/// every decision. The two failure callbacks return how long the transport
/// should wait before its next attempt.
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// A connection attempt is about to start.
    async fn on_connect_start(&self, url: &str);

    /// The websocket handshake completed.
    async fn on_open(&self, connection: ConnectionHandle);

    /// A data frame arrived.
    async fn on_message(&self, data: &[u8], is_binary: bool);

    /// The open connection closed.
    async fn on_close(&self, was_clean: bool, code: Option<u16>, reason: &str);

    /// The attempt failed before the connection opened.
    async fn on_connect_failed(&self, reason: &str) -> Duration;

    /// A connection that had opened is gone.
    async fn on_connection_lost(&self, reason: &str) -> Duration;
}

/// Boxed connection handler.
pub type BoxedConnectionHandler = Arc<dyn ConnectionHandler>;

// =============================================================================
// Lifecycle Events
// =============================================================================

/// One transport lifecycle event, as delivered to a [`ConnectionHandler`].
///
/// Lets the client state machine be driven without a socket.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// An attempt is starting.
    ConnectStart {
        /// URL being dialled.
        url: String,
    },
    /// The connection opened.
    Open(ConnectionHandle),
    /// A data frame arrived.
    Message {
        /// Frame bytes.
        data: Vec<u8>,
        /// Whether it was a binary frame.
        is_binary: bool,
    },
    /// The connection closed.
    Close {
        /// Whether a close handshake took place.
        was_clean: bool,
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
    /// The attempt failed.
    ConnectFailed {
        /// Failure reason.
        reason: String,
    },
    /// An open connection was lost.
    ConnectionLost {
        /// Failure reason.
        reason: String,
    },
}

impl LinkEvent {
    /// A text frame event.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            data: text.into().into_bytes(),
            is_binary: false,
        }
    }
}

// =============================================================================
// Connection Handle
// =============================================================================

/// Handle to one open connection.
///
/// Frames sent through a handle are queued and written by the transport
/// task in order. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Identifier of this connection, unique per process.
    pub id: String,
    /// Sender for outgoing text frames.
    message_tx: mpsc::Sender<Vec<u8>>,
    /// Close signal sender.
    close_tx: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Creates a connection handle.
    pub fn new(
        id: impl Into<String>,
        message_tx: mpsc::Sender<Vec<u8>>,
        close_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            id: id.into(),
            message_tx,
            close_tx: Arc::new(close_tx),
        }
    }

    /// Creates a handle whose frames land on the returned receiver.
    ///
    /// Nothing watches the close signal; useful to drive a handler
    /// without a socket.
    pub fn detached(
        id: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (message_tx, message_rx) = mpsc::channel(capacity.max(1));
        let (close_tx, _) = watch::channel(false);
        (Self::new(id, message_tx, close_tx), message_rx)
    }

    /// Queues raw bytes as a text frame.
    pub async fn send(&self, data: Vec<u8>) -> TransportResult<()> {
        self.message_tx
            .send(data)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Queues an outbound protocol frame.
    pub async fn send_frame(&self, frame: &OutboundFrame) -> TransportResult<()> {
        self.send(frame.to_text().into_bytes()).await
    }

    /// Asks the transport to close this connection.
    pub fn close(&self) {
        self.close_tx.send_replace(true);
    }

    /// Returns true once [`close`](Self::close) was called or the
    /// transport task has gone away.
    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow() || self.message_tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_frame_queues_json() {
        let (handle, mut rx) = ConnectionHandle::detached("c1", 4);
        handle
            .send_frame(&OutboundFrame::Authorization {
                bearer: "b".into(),
            })
            .await
            .unwrap();
        let sent = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sent).unwrap();
        assert_eq!(value["action"], "authorization");
        assert_eq!(value["bearer"], "b");
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (handle, rx) = ConnectionHandle::detached("c1", 1);
        drop(rx);
        assert!(handle.is_closed());
        tokio_test::assert_err!(handle.send(b"x".to_vec()).await);
    }

    #[test]
    fn test_close_flags_handle() {
        let (handle, _rx) = ConnectionHandle::detached("c1", 1);
        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
    }
}
