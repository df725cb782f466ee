//! Notification sinks.
//!
//! Every operator-visible line (stream health, relayed tracker events) goes
//! through a [`NotificationSink`]. Sinks are called from the stream task and
//! must never block it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Posts one line of text to the bound chat channel.
pub trait NotificationSink: Send + Sync {
    /// Queues `text` for posting. Must return without waiting on I/O.
    fn notify(&self, text: &str);
}

/// Boxed notification sink.
pub type BoxedSink = Arc<dyn NotificationSink>;

/// Sink that forwards notices over an unbounded channel.
///
/// The receiving half is owned by whatever posts to chat.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its notices arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, text: &str) {
        if self.tx.send(text.to_string()).is_err() {
            warn!(notice = %text, "Notice receiver dropped, discarding notice");
        }
    }
}

/// Sink that writes notices to the log under the `chat` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, text: &str) {
        info!(target: "chat", "{text}");
    }
}
