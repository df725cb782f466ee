//! Websocket transport.

mod client;

pub use client::{StreamControl, WsClient};
