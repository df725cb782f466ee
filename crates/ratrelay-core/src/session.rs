//! Session state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Connected
//!      ▲                                            │ authorization event
//!      │                                            ▼
//!      └──────────── close (any) ────────── Authenticated ──subscribe sent──▶ Subscribed
//! ```
//!
//! The session decides which outbound frame (if any) each transition
//! produces; it never touches the socket itself.

use std::fmt;

use crate::envelope::OutboundFrame;
use crate::error::SessionError;

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No connection and no attempt in progress.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Socket open, authorization request sent, not yet confirmed.
    Connected,
    /// Authorization confirmed, subscription request pending.
    Authenticated,
    /// Subscription request sent; events flow.
    Subscribed,
}

impl Phase {
    /// Returns true once authorization has been confirmed.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Subscribed)
    }

    /// Returns the phase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Subscribed => "subscribed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials presented during the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token sent in the authorization frame.
    pub bearer: String,
    /// Application id sent in the subscribe frame.
    pub application_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &"<redacted>")
            .field("application_id", &self.application_id)
            .finish()
    }
}

/// The authenticated, subscribed layer on top of one connection.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    credentials: Credentials,
}

impl Session {
    /// Creates a disconnected session.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            phase: Phase::Disconnected,
            credentials,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A connection attempt has started.
    pub fn connecting(&mut self) {
        self.phase = Phase::Connecting;
    }

    /// The socket opened. Returns the authorization frame to send at once.
    pub fn opened(&mut self) -> OutboundFrame {
        self.phase = Phase::Connected;
        OutboundFrame::Authorization {
            bearer: self.credentials.bearer.clone(),
        }
    }

    /// An `authorization` event arrived.
    ///
    /// Returns the subscribe frame on the first confirmation of this
    /// connection and `None` on repeats.
    pub fn authorized(&mut self) -> Result<Option<OutboundFrame>, SessionError> {
        match self.phase {
            Phase::Connected => {
                self.phase = Phase::Authenticated;
                Ok(Some(OutboundFrame::Subscribe {
                    application_id: self.credentials.application_id.clone(),
                }))
            }
            Phase::Authenticated | Phase::Subscribed => Ok(None),
            phase @ (Phase::Disconnected | Phase::Connecting) => {
                Err(SessionError::NotConnected { phase })
            }
        }
    }

    /// The subscribe frame was handed to the transport.
    pub fn subscription_sent(&mut self) {
        if self.phase == Phase::Authenticated {
            self.phase = Phase::Subscribed;
        }
    }

    /// The connection closed, cleanly or not.
    pub fn closed(&mut self) {
        self.phase = Phase::Disconnected;
    }

    /// Returns true if events other than `authorization` may be dispatched.
    pub fn may_dispatch(&self) -> bool {
        self.phase.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Credentials {
            bearer: "sekret".into(),
            application_id: "0xDEADBEEF".into(),
        })
    }

    #[test]
    fn test_full_handshake() {
        let mut s = session();
        s.connecting();
        assert_eq!(s.phase(), Phase::Connecting);

        let auth = s.opened();
        assert_eq!(auth.action(), "authorization");
        assert!(!s.may_dispatch());

        let sub = s.authorized().unwrap().unwrap();
        assert_eq!(sub.action(), "stream:subscribe");
        assert_eq!(s.phase(), Phase::Authenticated);
        assert!(s.may_dispatch());

        s.subscription_sent();
        assert_eq!(s.phase(), Phase::Subscribed);
    }

    #[test]
    fn test_second_authorization_sends_nothing() {
        let mut s = session();
        s.opened();
        assert!(s.authorized().unwrap().is_some());
        assert!(s.authorized().unwrap().is_none());
        s.subscription_sent();
        assert!(s.authorized().unwrap().is_none());
    }

    #[test]
    fn test_authorization_before_open_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.authorized(),
            Err(SessionError::NotConnected {
                phase: Phase::Disconnected
            })
        );
        s.connecting();
        assert!(s.authorized().is_err());
    }

    #[test]
    fn test_close_from_any_phase() {
        let mut s = session();
        s.opened();
        s.authorized().unwrap();
        s.closed();
        assert_eq!(s.phase(), Phase::Disconnected);
        assert!(!s.may_dispatch());
    }

    #[test]
    fn test_credentials_debug_redacts_bearer() {
        let text = format!("{:?}", session());
        assert!(!text.contains("sekret"));
    }
}
