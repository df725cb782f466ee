//! # ratrelay transport
//!
//! Network implementations behind the seams `ratrelay-core` defines.
//!
//! ## Features
//!
//! - `ws-client` (default): reconnecting websocket loop driving a
//!   [`ConnectionHandler`](ratrelay_core::ConnectionHandler)
//! - `http-client` (default): [`CaseStore`](ratrelay_core::CaseStore) and
//!   [`NameResolver`](ratrelay_core::NameResolver) over the rescue API
//!
//! ```text
//! ┌──────────────────────┐
//! │  ratrelay-framework  │  StreamClient, handlers
//! ├──────────────────────┤
//! │  ratrelay-core       │  ConnectionHandler, CaseStore, NameResolver
//! ├──────────────────────┤
//! │  ratrelay-transport  │  <- this crate
//! ├──────────────────────┤
//! │  Network (TCP/TLS)   │
//! └──────────────────────┘
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "http-client")]
pub use http::{ApiClient, HttpCaseStore, HttpNameResolver};

#[cfg(feature = "ws-client")]
pub use websocket::{StreamControl, WsClient};
