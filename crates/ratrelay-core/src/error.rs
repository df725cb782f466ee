//! Unified error types for the ratrelay core.
//!
//! Each layer of the stream client has its own error enum so callers (and
//! tests) can tell a transport hiccup from a malformed frame or a failed
//! API write. Handler errors live in `ratrelay-framework`.

use thiserror::Error;

use crate::session::Phase;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Invalid target configuration.
    #[error("invalid transport target: {0}")]
    InvalidTarget(String),
}

// =============================================================================
// Protocol Errors
// =============================================================================

/// A text frame that could not be turned into an envelope.
///
/// Protocol errors drop the single frame; the session carries on.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// Frame was not valid UTF-8 JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    /// Frame has no `meta.action` tag.
    #[error("frame has no meta.action tag")]
    MissingAction,

    /// The `data` member is present but is not an object.
    #[error("frame data for '{action}' is not an object")]
    DataNotObject {
        /// Tag of the offending frame.
        action: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Invalid transition requested of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Authorization arrived on a session that has no open connection.
    #[error("cannot authorize while {phase}")]
    NotConnected {
        /// Phase the session was in.
        phase: Phase,
    },
}

// =============================================================================
// Persistence Errors
// =============================================================================

/// Errors raised while saving or fetching cases through the API.
#[derive(Debug, Clone, Error)]
pub enum PersistError {
    /// The HTTP request itself failed.
    #[error("API request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// The response body had no usable `data`.
    #[error("API response returned unusable data")]
    UnusableResponse,

    /// Failed to serialize/deserialize a case.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for frame decoding.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Result type for persistence calls.
pub type PersistResult<T> = Result<T, PersistError>;
