//! # ratrelay
//!
//! Keeps a websocket connection to the rescue API's event stream alive and
//! relays RatTracker events into chat.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐ frames ┌──────────────┐ envelopes ┌────────┐      ┌──────────┐
//! │ WsClient  │───────▶│ StreamClient │──────────▶│ Router │─────▶│ Handlers │──▶ sink
//! │(transport)│◀───────│ (session,    │           └────────┘      └──────────┘
//! └───────────┘ auth,  │  backoff)    │                                │
//!           subscribe  └──────────────┘                     CaseBoard / CaseStore
//! ```
//!
//! - **Runtime**: loads configuration, sets up logging, owns the stream loop
//! - **Transport**: reconnecting websocket loop and the rescue API client
//! - **Framework**: session handshake, event routing and the handlers
//! - **Core**: frames, payloads, cases and the seams between layers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use ratrelay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RelayRuntime::builder().config_file("ratrelay.toml").build()?;
//!     runtime.run(Arc::new(TracingSink)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use ratrelay_core as core;
pub use ratrelay_framework as framework;
pub use ratrelay_runtime as runtime;
pub use ratrelay_transport as transport;

/// Commonly used types.
pub mod prelude {
    // Runtime - main entry point
    pub use ratrelay_runtime::{RelayConfig, RelayRuntime, RuntimeBuilder};

    // Notices
    pub use ratrelay_core::{BoxedSink, ChannelSink, NotificationSink, TracingSink};

    // State
    pub use ratrelay_core::{Case, CaseBoard, Phase};
    pub use ratrelay_framework::{ClientStatus, StreamClient};

    // Extension points
    pub use ratrelay_core::{CaseStore, NameResolver, Payload};
    pub use ratrelay_framework::{EventHandler, EventTag, HandlerContext, Outcome, Router};
}
