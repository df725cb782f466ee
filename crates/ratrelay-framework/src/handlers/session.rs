//! Handlers for stream and rat status events.

use ratrelay_core::Payload;

use crate::handler::{BoxFuture, EventHandler, HandlerContext, HandlerError, HandlerResult, Outcome};

/// Notice for a confirmed authorization.
pub const AUTHENTICATED_NOTICE: &str = "[Websocket] Authenticated with the API!";

/// Notice for the server's greeting.
pub const WELCOME_NOTICE: &str = "[Websocket] Successfully welcomed to Websocket!";

/// `authorization`: the server accepted the bearer credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationHandler;

impl EventHandler for AuthorizationHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        _payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            ctx.notify(AUTHENTICATED_NOTICE);
            Ok(Outcome::Authorized)
        })
    }
}

/// `welcome`: the stream is live.
#[derive(Debug, Clone, Copy, Default)]
pub struct WelcomeHandler;

impl EventHandler for WelcomeHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        _payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            ctx.notify(WELCOME_NOTICE);
            Ok(Outcome::Handled)
        })
    }
}

/// `OnDuty:update`: a rat went on or off duty.
///
/// Only the literal `True` means on duty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnDutyHandler;

impl EventHandler for OnDutyHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let on_duty = payload
                .flag("OnDuty", "True")
                .ok_or(HandlerError::MissingField { field: "OnDuty" })?;
            let rat = ctx.rat_name(payload).await;

            let text = if on_duty {
                let location = payload
                    .text("currentSystem")
                    .unwrap_or_else(|| "unknown".to_string());
                format!("{rat} is now on Duty! (Current Location: {location}) [Reported by RatTracker]")
            } else {
                format!("{rat} is now off Duty! [Reported by RatTracker]")
            };
            ctx.notify(&text);
            Ok(Outcome::Handled)
        })
    }
}
