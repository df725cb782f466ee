//! The stream client state machine.
//!
//! [`StreamClient`] owns the session, the retry state and the routing
//! table, and reacts to transport lifecycle events. It implements
//! [`ConnectionHandler`] so a websocket loop can drive it, and exposes
//! [`StreamClient::on_event`] so tests can drive it without one.
//!
//! # Lifecycle
//!
//! ```text
//! ConnectStart ─▶ Open ─▶ send authorization
//!                   │
//!                   ├─▶ Message "authorization" ─▶ send stream:subscribe
//!                   ├─▶ Message <event>         ─▶ router (once authenticated)
//!                   │
//!                   └─▶ Close ─▶ ConnectionLost ─▶ wait delay ─▶ ConnectStart
//! ConnectStart ─▶ ConnectFailed ─▶ wait delay ─▶ ConnectStart
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use ratrelay_core::{
    ConnectionHandle, ConnectionHandler, Credentials, Frame, LinkEvent, OutboundFrame, Phase,
    RecentLog, ReconnectPolicy, RetryConfig, Session,
};
use tracing::{debug, info, trace, warn};

use crate::handler::HandlerContext;
use crate::router::{DispatchOutcome, Router};
use crate::tag::EventTag;

// =============================================================================
// Notices
// =============================================================================

/// Notice for an opened socket.
pub const OPENED_NOTICE: &str = "[Websocket] Successfully opened connection to Websocket!";

/// Notice for a frame that is not a decodable event.
pub const MALFORMED_NOTICE: &str =
    "[Websocket] Couldn't get data or action - Ignoring Websocket Event.";

fn connecting_notice(url: &str) -> String {
    format!("[Websocket] Connecting to {url}...")
}

fn closed_notice(reason: &str) -> String {
    format!("[Websocket] Closed connection with Websocket. Reason: {reason}")
}

fn refused_notice(reason: &str) -> String {
    format!("Connection to Websocket refused. reason: {reason}")
}

fn lost_notice(reason: &str) -> String {
    format!("[Websocket] Lost connection to Websocket. Reason: {reason}")
}

fn retry_notice(delay: Duration) -> String {
    format!(
        "[Websocket] Reconnecting to API Websocket in {} seconds...",
        delay.as_secs_f64()
    )
}

fn error_frame_notice(errors: &serde_json::Value) -> String {
    format!("[Websocket] Couldn't grab Data field. Here's the Error field: {errors}")
}

// =============================================================================
// Status
// =============================================================================

/// Snapshot of the client's connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    /// Session phase.
    pub phase: Phase,
    /// Reconnect attempts since the last open.
    pub attempts: u32,
    /// Delay the next reconnect attempt will wait.
    pub current_delay: Duration,
    /// Id of the open connection, if any.
    pub connection_id: Option<String>,
    /// The server welcomed this connection.
    pub live: bool,
}

// =============================================================================
// Stream Client
// =============================================================================

struct ClientState {
    session: Session,
    policy: ReconnectPolicy,
    connection: Option<ConnectionHandle>,
    live: bool,
}

/// Resilient tracker stream client.
///
/// All mutable state sits behind one lock that is released before any
/// frame is sent or any handler runs.
pub struct StreamClient {
    state: Mutex<ClientState>,
    router: Router,
    ctx: HandlerContext,
    recent: Arc<RecentLog>,
}

impl StreamClient {
    /// Creates a disconnected client.
    pub fn new(
        credentials: Credentials,
        retry: RetryConfig,
        router: Router,
        ctx: HandlerContext,
    ) -> Self {
        Self {
            state: Mutex::new(ClientState {
                session: Session::new(credentials),
                policy: ReconnectPolicy::new(retry),
                connection: None,
                live: false,
            }),
            router,
            ctx,
            recent: Arc::new(RecentLog::default()),
        }
    }

    /// Records inbound frames into `recent` instead of a private log.
    pub fn with_recent_log(mut self, recent: Arc<RecentLog>) -> Self {
        self.recent = recent;
        self
    }

    /// Current connection state.
    pub fn status(&self) -> ClientStatus {
        let state = self.state.lock();
        ClientStatus {
            phase: state.session.phase(),
            attempts: state.policy.attempts(),
            current_delay: state.policy.current_delay(),
            connection_id: state.connection.as_ref().map(|c| c.id.clone()),
            live: state.live,
        }
    }

    /// Current session phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().session.phase()
    }

    /// The log of recently received frames.
    pub fn recent(&self) -> &Arc<RecentLog> {
        &self.recent
    }

    /// The context handlers run in.
    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Feeds one lifecycle event through the state machine.
    ///
    /// Returns the reconnect delay for failure events.
    pub async fn on_event(&self, event: LinkEvent) -> Option<Duration> {
        match event {
            LinkEvent::ConnectStart { url } => {
                self.connect_start(&url);
                None
            }
            LinkEvent::Open(connection) => {
                self.opened(connection).await;
                None
            }
            LinkEvent::Message { data, is_binary } => {
                self.receive(&data, is_binary).await;
                None
            }
            LinkEvent::Close {
                was_clean,
                code,
                reason,
            } => {
                self.closed(was_clean, code, &reason);
                None
            }
            LinkEvent::ConnectFailed { reason } => Some(self.connect_failed(&reason)),
            LinkEvent::ConnectionLost { reason } => Some(self.connection_lost(&reason)),
        }
    }

    fn connect_start(&self, url: &str) {
        self.state.lock().session.connecting();
        info!(url = %url, "Connecting to event stream");
        self.ctx.notify(&connecting_notice(url));
    }

    async fn opened(&self, connection: ConnectionHandle) {
        let auth = {
            let mut state = self.state.lock();
            state.policy.reset();
            state.connection = Some(connection.clone());
            state.live = false;
            state.session.opened()
        };
        info!(connection_id = %connection.id, "Event stream connection opened");
        self.ctx.notify(OPENED_NOTICE);
        self.send(&connection, &auth).await;
    }

    /// Handles one data frame.
    ///
    /// Returns the dispatch outcome, or `None` if the frame was not
    /// dispatched (binary, malformed, error report or not yet authenticated).
    pub async fn receive(&self, data: &[u8], is_binary: bool) -> Option<DispatchOutcome> {
        if is_binary {
            debug!(len = data.len(), "Binary frame received, ignoring");
            return None;
        }
        let text = String::from_utf8_lossy(data);
        trace!(frame = %text, "Text frame received");
        self.recent.push(&text);

        let envelope = match Frame::decode(data) {
            Ok(Frame::Event(envelope)) => envelope,
            Ok(Frame::Error { tag, errors }) => {
                warn!(tag = ?tag, errors = %errors, "Server reported an error instead of data");
                self.ctx.notify(&error_frame_notice(&errors));
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Malformed frame");
                self.ctx.notify(MALFORMED_NOTICE);
                return None;
            }
        };

        let is_authorization = envelope.tag == EventTag::Authorization.as_str();
        let may_dispatch = self.state.lock().session.may_dispatch();
        if !is_authorization && !may_dispatch {
            debug!(tag = %envelope.tag, "Event before authentication, dropping");
            return None;
        }

        let outcome = self.router.dispatch(&self.ctx, &envelope).await;
        match outcome {
            DispatchOutcome::Authorized => self.subscribe().await,
            DispatchOutcome::Handled if envelope.tag == EventTag::Welcome.as_str() => {
                self.state.lock().live = true;
                debug!("Event stream is live");
            }
            _ => {}
        }
        Some(outcome)
    }

    async fn subscribe(&self) {
        let (frame, connection) = {
            let mut state = self.state.lock();
            match state.session.authorized() {
                Ok(Some(frame)) => (frame, state.connection.clone()),
                Ok(None) => {
                    debug!("Already authenticated on this connection");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring authorization");
                    return;
                }
            }
        };
        let Some(connection) = connection else {
            return;
        };

        if self.send(&connection, &frame).await {
            let mut state = self.state.lock();
            let same = state
                .connection
                .as_ref()
                .is_some_and(|c| c.id == connection.id);
            if same {
                state.session.subscription_sent();
                info!(connection_id = %connection.id, "Subscribed to event stream");
            }
        }
    }

    fn closed(&self, was_clean: bool, code: Option<u16>, reason: &str) {
        {
            let mut state = self.state.lock();
            state.session.closed();
            state.connection = None;
            state.live = false;
        }
        info!(was_clean, code = ?code, reason = %reason, "Event stream connection closed");
        self.ctx.notify(&closed_notice(reason));
    }

    fn connect_failed(&self, reason: &str) -> Duration {
        let (delay, attempts) = self.schedule_retry();
        warn!(reason = %reason, attempts, delay = ?delay, "Connection attempt failed");
        self.ctx.notify(&refused_notice(reason));
        self.ctx.notify(&retry_notice(delay));
        delay
    }

    fn connection_lost(&self, reason: &str) -> Duration {
        let (delay, attempts) = self.schedule_retry();
        warn!(reason = %reason, attempts, delay = ?delay, "Event stream connection lost");
        self.ctx.notify(&lost_notice(reason));
        self.ctx.notify(&retry_notice(delay));
        delay
    }

    fn schedule_retry(&self) -> (Duration, u32) {
        let mut state = self.state.lock();
        state.session.closed();
        state.connection = None;
        state.live = false;
        let delay = state.policy.schedule();
        (delay, state.policy.attempts())
    }

    async fn send(&self, connection: &ConnectionHandle, frame: &OutboundFrame) -> bool {
        match connection.send_frame(frame).await {
            Ok(()) => {
                debug!(connection_id = %connection.id, action = frame.action(), "Frame sent");
                true
            }
            Err(e) => {
                warn!(
                    connection_id = %connection.id,
                    action = frame.action(),
                    error = %e,
                    "Failed to send frame"
                );
                false
            }
        }
    }
}

#[async_trait]
impl ConnectionHandler for StreamClient {
    async fn on_connect_start(&self, url: &str) {
        self.connect_start(url);
    }

    async fn on_open(&self, connection: ConnectionHandle) {
        self.opened(connection).await;
    }

    async fn on_message(&self, data: &[u8], is_binary: bool) {
        self.receive(data, is_binary).await;
    }

    async fn on_close(&self, was_clean: bool, code: Option<u16>, reason: &str) {
        self.closed(was_clean, code, reason);
    }

    async fn on_connect_failed(&self, reason: &str) -> Duration {
        self.connect_failed(reason)
    }

    async fn on_connection_lost(&self, reason: &str) -> Duration {
        self.connection_lost(reason)
    }
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("status", &self.status())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
