//! # ratrelay core
//!
//! Building blocks of the tracker stream client.
//!
//! ## Layers
//!
//! - **Wire**: inbound [`Frame`]s and [`OutboundFrame`]s, loosely-typed
//!   [`Payload`] access with the identity-key fallbacks.
//! - **State**: the [`Session`] state machine and the [`ReconnectPolicy`].
//! - **Transport seam**: [`Target`], [`ConnectionHandle`] and the
//!   [`ConnectionHandler`] callbacks a websocket implementation drives.
//! - **Collaborators**: the [`NotificationSink`] notices go to, the
//!   [`CaseStore`] and [`NameResolver`] the handlers call, and the shared
//!   [`CaseBoard`].
//!
//! ```text
//! ┌───────────┐ bytes ┌─────────┐ Envelope ┌────────┐       ┌─────────┐
//! │ Transport │──────▶│ Session │─────────▶│ Router │──────▶│ Handler │──▶ sink / store
//! └───────────┘       └─────────┘          └────────┘       └─────────┘
//! ```

pub mod case;
pub mod collaborator;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod recent;
pub mod retry;
pub mod session;
pub mod sink;
pub mod transport;

pub use case::{Case, CaseBoard, SystemChange};
pub use collaborator::{
    BoxedCaseStore, BoxedNameResolver, CaseStore, NameResolver, NoNames, UNKNOWN_NAME,
};
pub use envelope::{Envelope, Frame, OutboundFrame};
pub use error::{
    PersistError, PersistResult, ProtocolError, ProtocolResult, SessionError, TransportError,
    TransportResult,
};
pub use payload::{Payload, RAT_ID_KEYS, RESCUE_ID_KEYS};
pub use recent::{RecentEntry, RecentLog};
pub use retry::{ReconnectPolicy, RetryConfig};
pub use session::{Credentials, Phase, Session};
pub use sink::{BoxedSink, ChannelSink, NotificationSink, TracingSink};
pub use transport::{BoxedConnectionHandler, ConnectionHandle, ConnectionHandler, LinkEvent, Target};
