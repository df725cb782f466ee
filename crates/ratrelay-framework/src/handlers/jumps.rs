//! `CallJumps:update`: a rat called their jump count.

use ratrelay_core::Payload;

use crate::handler::{BoxFuture, EventHandler, HandlerContext, HandlerError, HandlerResult, Outcome};

/// Relays a jump call with the distance truncated to whole lightyears.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallJumpsHandler;

/// Truncates a reported distance to whole lightyears.
///
/// Tried in order: an integer before the first `,` (a thousands separator
/// cuts the value short), an integer before the first `.`, then a float
/// truncated toward zero. Floats outside the `i64` range yield `None`.
pub fn truncate_lightyears(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let before = |sep: char| raw.split(sep).next().unwrap_or(raw).trim();

    before(',')
        .parse::<i64>()
        .or_else(|_| before('.').parse::<i64>())
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .map(f64::trunc)
                .filter(|ly| ly.is_finite() && *ly >= i64::MIN as f64 && *ly < i64::MAX as f64)
                .map(|ly| ly as i64)
        })
}

impl EventHandler for CallJumpsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let jumps = payload
                .text("CallJumps")
                .ok_or(HandlerError::MissingField { field: "CallJumps" })?;
            let source = payload.text("SourceCertainty");
            let client = ctx.client_name(payload).await;
            let rat = ctx.rat_name(payload).await;

            if source.as_deref() == Some("Fuelum") {
                ctx.notify(&format!(
                    "{rat}: {jumps}j from Fuelum. [Case {client}, Unknown Rat Location, RatTracker]"
                ));
                return Ok(Outcome::Handled);
            }

            let raw = payload
                .text("Lightyears")
                .ok_or(HandlerError::MissingField { field: "Lightyears" })?;
            let Some(ly) = truncate_lightyears(&raw) else {
                ctx.notify(&format!(
                    "{rat}: {jumps}j, distance could not be parsed ({raw}) [Case {client}, RatTracker]"
                ));
                return Ok(Outcome::ParseFallback {
                    field: "Lightyears",
                    raw,
                });
            };

            let exact = source.as_deref() == Some("Exact")
                && payload.text("DestinationCertainty").as_deref() == Some("Exact");
            let text = if exact {
                format!("{rat}: {jumps}j, {ly}LY [Case {client}, RatTracker]")
            } else {
                format!(
                    "{rat}: {jumps}j - Estimate, no exact System. {ly}LY [Case {client}, RatTracker]"
                )
            };
            ctx.notify(&text);
            Ok(Outcome::Handled)
        })
    }
}
