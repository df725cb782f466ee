//! # ratrelay framework
//!
//! Turns decoded stream events into chat notices.
//!
//! - [`Router`]: immutable tag → [`EventHandler`] table and the failure
//!   boundary for handlers.
//! - [`handlers`]: the standard handlers, one per [`EventTag`].
//! - [`CasePersister`]: fire-and-forget case saves.
//! - [`StreamClient`]: session, retry policy and router combined into the
//!   state machine a transport drives.

pub mod client;
pub mod handler;
pub mod handlers;
pub mod persister;
pub mod router;
pub mod tag;

#[cfg(test)]
mod testing;

pub use client::{ClientStatus, StreamClient};
pub use handler::{
    BoxFuture, BoxedEventHandler, EventHandler, HandlerContext, HandlerError, HandlerResult,
    Outcome,
};
pub use persister::CasePersister;
pub use router::{DispatchOutcome, HANDLER_FAILURE_NOTICE, Router, RouterBuilder};
pub use tag::EventTag;
