//! Wire format of the tracker stream.
//!
//! # Inbound
//!
//! ```text
//! { "meta": { "action": "FriendRequest:update" }, "data": { ... } }   -> Frame::Event
//! { "meta": { ... }, "errors": [ ... ] }                              -> Frame::Error
//! ```
//!
//! # Outbound
//!
//! ```text
//! { "action": "authorization", "bearer": "<credential>" }
//! { "action": "stream:subscribe", "applicationId": "<id>" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::payload::Payload;

/// One decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The `meta.action` tag.
    pub tag: String,
    /// The `data` object.
    pub payload: Payload,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(tag: impl Into<String>, payload: Payload) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }
}

/// A decoded inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A regular event.
    Event(Envelope),
    /// A frame without `data`; the server is reporting an error.
    Error {
        /// The `meta.action` tag, if the server sent one.
        tag: Option<String>,
        /// The `errors` member, or `null` if absent.
        errors: Value,
    },
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    meta: Option<RawMeta>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Deserialize)]
struct RawMeta {
    #[serde(default)]
    action: Option<String>,
}

impl Frame {
    /// Decodes a UTF-8 JSON text frame.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let raw: RawFrame = serde_json::from_slice(bytes)?;
        let tag = raw.meta.and_then(|m| m.action);

        let Some(data) = raw.data.filter(|d| !d.is_null()) else {
            return Ok(Self::Error {
                tag,
                errors: raw.errors.unwrap_or(Value::Null),
            });
        };

        let tag = tag.ok_or(ProtocolError::MissingAction)?;
        match Payload::from_value(data) {
            Some(payload) => Ok(Self::Event(Envelope::new(tag, payload))),
            None => Err(ProtocolError::DataNotObject { action: tag }),
        }
    }
}

/// Frames the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum OutboundFrame {
    /// Authentication request, sent as soon as the socket opens.
    #[serde(rename = "authorization")]
    Authorization {
        /// Bearer credential.
        bearer: String,
    },
    /// Stream subscription, sent once authorization is confirmed.
    #[serde(rename = "stream:subscribe")]
    Subscribe {
        /// Fixed application identifier.
        #[serde(rename = "applicationId")]
        application_id: String,
    },
}

impl OutboundFrame {
    /// Returns the frame's action name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Authorization { .. } => "authorization",
            Self::Subscribe { .. } => "stream:subscribe",
        }
    }

    /// Serializes the frame to JSON text.
    pub fn to_text(&self) -> String {
        // Both variants hold only strings, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
