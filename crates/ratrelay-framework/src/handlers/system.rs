//! `ClientSystem:update`: the client's star system was reported.

use ratrelay_core::{Payload, SystemChange};
use tracing::debug;

use crate::handler::{BoxFuture, EventHandler, HandlerContext, HandlerError, HandlerResult, Outcome};

/// Moves the tracked case to the reported system and saves it.
///
/// Untracked cases and repeats of the current system are ignored silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientSystemHandler;

impl EventHandler for ClientSystemHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let system = payload
                .text("SystemName")
                .ok_or(HandlerError::MissingField { field: "SystemName" })?;
            let Some(rescue_id) = payload.rescue_id() else {
                debug!(system = %system, "Client system without rescue id");
                return Ok(Outcome::Handled);
            };

            let case = match ctx.board().set_system(&rescue_id, &system) {
                SystemChange::Updated(case) => case,
                SystemChange::UnknownCase => {
                    debug!(rescue_id = %rescue_id, "Client system for untracked case");
                    return Ok(Outcome::Handled);
                }
                SystemChange::Unchanged => return Ok(Outcome::Handled),
            };

            let client = ctx.client_name(payload).await;
            let rat = ctx.rat_name(payload).await;
            ctx.notify(&format!(
                "{rat}: {client}'s System is {system}! Case updated. [RatTracker]"
            ));
            ctx.persister().submit(case);
            Ok(Outcome::Handled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use ratrelay_core::Case;

    fn report(rescue_id: &str, system: &str) -> Payload {
        Payload::default()
            .with("RescueID", rescue_id)
            .with("RatID", "r1")
            .with("SystemName", system)
    }

    #[tokio::test]
    async fn test_updates_board_and_saves() {
        let mut fx = Fixture::new();
        fx.board.insert(Case::new("Ada").with_id("c1").with_system("Sol"));

        ClientSystemHandler
            .handle(&fx.ctx, &report("c1", "Fuelum"))
            .await
            .unwrap();

        assert_eq!(
            fx.notices(),
            ["Ratty: Ada's System is Fuelum! Case updated. [RatTracker]"]
        );
        assert_eq!(fx.board.get("c1").unwrap().system.as_deref(), Some("Fuelum"));

        fx.ctx.persister().drain().await;
        let saved = fx.store.saved.lock();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].system.as_deref(), Some("Fuelum"));
    }

    #[tokio::test]
    async fn test_same_system_is_silent() {
        let mut fx = Fixture::new();
        fx.board.insert(Case::new("Ada").with_id("c1").with_system("Sol"));

        ClientSystemHandler
            .handle(&fx.ctx, &report("c1", "Sol"))
            .await
            .unwrap();

        assert!(fx.notices().is_empty());
        assert_eq!(fx.ctx.persister().submitted(), 0);
        assert_eq!(fx.names.lookups(), 0);
    }

    #[tokio::test]
    async fn test_untracked_case_is_silent() {
        let mut fx = Fixture::new();
        ClientSystemHandler
            .handle(&fx.ctx, &report("nope", "Sol"))
            .await
            .unwrap();
        assert!(fx.notices().is_empty());
        assert_eq!(fx.ctx.persister().submitted(), 0);
    }

    #[tokio::test]
    async fn test_lowercase_rescue_key() {
        let mut fx = Fixture::new();
        fx.board.insert(Case::new("Ada").with_id("c1"));
        let payload = Payload::default()
            .with("rescueid", "c1")
            .with("SystemName", "Maia");
        ClientSystemHandler.handle(&fx.ctx, &payload).await.unwrap();
        assert_eq!(
            fx.notices(),
            ["unknown: Ada's System is Maia! Case updated. [RatTracker]"]
        );
    }
}
