//! Tag → handler routing.
//!
//! The routing table is built once and never changes afterwards. Dispatch
//! is the failure boundary for handlers: whatever a handler does, errors
//! and panics included, the stream keeps going.
//!
//! ```rust,ignore
//! let router = Router::builder()
//!     .route(EventTag::Welcome, WelcomeHandler)
//!     .route("Custom:update", MyHandler)
//!     .build();
//!
//! match router.dispatch(&ctx, &envelope).await {
//!     DispatchOutcome::Authorized => { /* advance the session */ }
//!     _ => {}
//! }
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use ratrelay_core::Envelope;
use tracing::{debug, error, warn};

use crate::handler::{BoxedEventHandler, EventHandler, HandlerContext, HandlerError, Outcome};
use crate::handlers::{
    AuthorizationHandler, CallJumpsHandler, ClientSystemHandler, OnDutyHandler, ToggleHandler,
    WelcomeHandler,
};
use crate::tag::EventTag;

/// Notice emitted when a handler fails.
pub const HANDLER_FAILURE_NOTICE: &str = "[Websocket] Got an error while handling WebSocket Event. Please report this including the time this happened.";

/// What came of dispatching one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and succeeded.
    Handled,
    /// The authorization handler ran.
    Authorized,
    /// A handler emitted a degraded notice for an unparseable field.
    ParseFallback {
        /// The unparseable field.
        field: &'static str,
        /// Its raw value.
        raw: String,
    },
    /// No handler is registered for the tag.
    UnknownTag(String),
    /// The handler failed; a generic notice was emitted.
    Failed(HandlerError),
}

impl From<Outcome> for DispatchOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Handled => Self::Handled,
            Outcome::Authorized => Self::Authorized,
            Outcome::ParseFallback { field, raw } => Self::ParseFallback { field, raw },
        }
    }
}

/// Immutable routing table.
#[derive(Clone)]
pub struct Router {
    routes: HashMap<String, BoxedEventHandler>,
}

impl Router {
    /// Starts an empty routing table.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// The routing table for every [`EventTag`].
    pub fn standard() -> Self {
        Self::builder().standard_routes().build()
    }

    /// Returns true if `tag` has a handler.
    pub fn handles(&self, tag: &str) -> bool {
        self.routes.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Runs the handler registered for the envelope's tag.
    pub async fn dispatch(&self, ctx: &HandlerContext, envelope: &Envelope) -> DispatchOutcome {
        let tag = envelope.tag.as_str();
        let Some(handler) = self.routes.get(tag) else {
            warn!(tag = %tag, "No handler for event, ignoring");
            return DispatchOutcome::UnknownTag(tag.to_string());
        };

        debug!(tag = %tag, "Dispatching event");
        let result = AssertUnwindSafe(handler.handle(ctx, &envelope.payload))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => {
                if let Outcome::ParseFallback { field, raw } = &outcome {
                    warn!(tag = %tag, field = %field, raw = %raw, "Could not parse event field");
                }
                outcome.into()
            }
            Ok(Err(e)) => fail(ctx, tag, e),
            Err(panic) => fail(ctx, tag, HandlerError::Panicked(panic_message(&*panic))),
        }
    }
}

fn fail(ctx: &HandlerContext, tag: &str, error: HandlerError) -> DispatchOutcome {
    error!(
        tag = %tag,
        error = %error,
        backtrace = %Backtrace::force_capture(),
        "Event handler failed"
    );
    ctx.notify(HANDLER_FAILURE_NOTICE);
    DispatchOutcome::Failed(error)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("tags", &self.tags()).finish()
    }
}

/// Builds a [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: HashMap<String, BoxedEventHandler>,
}

impl RouterBuilder {
    /// Routes `tag` to `handler`, replacing any earlier route.
    pub fn route<H>(mut self, tag: impl ToString, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.routes.insert(tag.to_string(), Arc::new(handler));
        self
    }

    /// Adds the handlers for every [`EventTag`].
    pub fn standard_routes(self) -> Self {
        self.route(EventTag::OnDuty, OnDutyHandler)
            .route(EventTag::Welcome, WelcomeHandler)
            .route(EventTag::FriendRequest, ToggleHandler::friend_request())
            .route(EventTag::WingRequest, ToggleHandler::wing_request())
            .route(EventTag::SysArrived, ToggleHandler::system_arrived())
            .route(EventTag::BeaconSpotted, ToggleHandler::beacon_spotted())
            .route(
                EventTag::InstanceSuccessful,
                ToggleHandler::instance_successful(),
            )
            .route(EventTag::Fueled, ToggleHandler::fueled())
            .route(EventTag::CallJumps, CallJumpsHandler)
            .route(EventTag::ClientSystem, ClientSystemHandler)
            .route(EventTag::Authorization, AuthorizationHandler)
    }

    /// Freezes the table.
    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
        }
    }
}
