//! Event handler trait and the context handlers run in.
//!
//! A handler turns one decoded payload into at most one notice, and may
//! touch the case board or submit a save. Handlers never see the session or
//! the socket; the [`Outcome`] they return is all the client learns.

use std::fmt;
use std::sync::Arc;

pub use futures::future::BoxFuture;
use ratrelay_core::{BoxedNameResolver, BoxedSink, CaseBoard, Payload};
use thiserror::Error;

use crate::persister::CasePersister;

// ============================================================================
// Outcome
// ============================================================================

/// What a handler did with its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event was handled.
    Handled,
    /// The event confirmed authorization; the session should advance.
    Authorized,
    /// A field could not be parsed and a degraded notice was emitted.
    ParseFallback {
        /// The unparseable field.
        field: &'static str,
        /// Its raw value.
        raw: String,
    },
}

/// Errors a handler may raise. The router turns these into a generic notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// A field the handler cannot do without is absent.
    #[error("payload is missing field '{field}'")]
    MissingField {
        /// Name of the field.
        field: &'static str,
    },

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Result of running a handler.
pub type HandlerResult = Result<Outcome, HandlerError>;

// ============================================================================
// Handler
// ============================================================================

/// Handles the payload of one event tag.
pub trait EventHandler: Send + Sync {
    /// Handles one payload.
    fn handle<'a>(&'a self, ctx: &'a HandlerContext, payload: &'a Payload)
    -> BoxFuture<'a, HandlerResult>;
}

/// Boxed event handler.
pub type BoxedEventHandler = Arc<dyn EventHandler>;

// ============================================================================
// Context
// ============================================================================

/// Everything handlers may call out to.
///
/// Built once at startup and shared by every dispatch.
#[derive(Clone)]
pub struct HandlerContext {
    sink: BoxedSink,
    board: Arc<CaseBoard>,
    names: BoxedNameResolver,
    persister: CasePersister,
}

impl HandlerContext {
    /// Creates a handler context.
    pub fn new(
        sink: BoxedSink,
        board: Arc<CaseBoard>,
        names: BoxedNameResolver,
        persister: CasePersister,
    ) -> Self {
        Self {
            sink,
            board,
            names,
            persister,
        }
    }

    /// Posts a notice to chat.
    pub fn notify(&self, text: &str) {
        self.sink.notify(text);
    }

    /// The shared case board.
    pub fn board(&self) -> &CaseBoard {
        &self.board
    }

    /// The case persister.
    pub fn persister(&self) -> &CasePersister {
        &self.persister
    }

    /// Commander name of the rat the payload refers to.
    pub async fn rat_name(&self, payload: &Payload) -> String {
        self.names.rat_name(payload.rat_id().as_deref()).await
    }

    /// Client name of the case the payload refers to.
    ///
    /// A case on the board answers without asking the API.
    pub async fn client_name(&self, payload: &Payload) -> String {
        let rescue_id = payload.rescue_id();
        if let Some(name) = rescue_id
            .as_deref()
            .and_then(|id| self.board.client_name(id))
        {
            return name;
        }
        self.names.client_name(rescue_id.as_deref()).await
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("cases", &self.board.len())
            .field("persister", &self.persister)
            .finish_non_exhaustive()
    }
}
