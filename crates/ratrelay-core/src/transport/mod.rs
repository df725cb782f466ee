//! Transport abstractions shared by the client state machine and the
//! websocket implementation.

mod connection;
mod target;

pub use connection::{BoxedConnectionHandler, ConnectionHandle, ConnectionHandler, LinkEvent};
pub use target::Target;
