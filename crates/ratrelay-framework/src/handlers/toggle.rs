//! Handlers for per-rat case progress flags.

use ratrelay_core::Payload;

use crate::handler::{BoxFuture, EventHandler, HandlerContext, HandlerError, HandlerResult, Outcome};

/// Relays a boolean progress flag as `{rat}: {label} [Case {client}, RatTracker]`.
///
/// The flag is set only when its field holds the literal `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleHandler {
    field: &'static str,
    set: &'static str,
    unset: &'static str,
}

impl ToggleHandler {
    /// Creates a handler for `field` with the labels for each state.
    pub const fn new(field: &'static str, set: &'static str, unset: &'static str) -> Self {
        Self { field, set, unset }
    }

    /// `FriendRequest:update`.
    pub const fn friend_request() -> Self {
        Self::new("FriendRequest", "fr+", "fr-")
    }

    /// `WingRequest:update`.
    pub const fn wing_request() -> Self {
        Self::new("WingRequest", "wr+", "wr-")
    }

    /// `SysArrived:update`.
    pub const fn system_arrived() -> Self {
        Self::new("ArrivedSystem", "sys+", "sys-")
    }

    /// `BeaconSpotted:update`.
    pub const fn beacon_spotted() -> Self {
        Self::new("BeaconSpotted", "bc+", "bc-")
    }

    /// `InstanceSuccessful:update`.
    pub const fn instance_successful() -> Self {
        Self::new("InstanceSuccessful", "inst+", "inst-")
    }

    /// `Fueled:update`.
    pub const fn fueled() -> Self {
        Self::new("Fueled", "Client Fueled!", "Client not Fueled!")
    }

    /// The payload field this handler reads.
    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl EventHandler for ToggleHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a HandlerContext,
        payload: &'a Payload,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let set = payload
                .flag(self.field, "true")
                .ok_or(HandlerError::MissingField { field: self.field })?;
            let client = ctx.client_name(payload).await;
            let rat = ctx.rat_name(payload).await;

            let label = if set { self.set } else { self.unset };
            ctx.notify(&format!("{rat}: {label} [Case {client}, RatTracker]"));
            Ok(Outcome::Handled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use ratrelay_core::Case;

    fn payload(field: &str, value: impl Into<serde_json::Value>) -> Payload {
        Payload::default()
            .with(field, value)
            .with("RatID", "r1")
            .with("RescueID", "c1")
    }

    #[tokio::test]
    async fn test_each_toggle_both_ways() {
        let cases = [
            (ToggleHandler::friend_request(), "fr+", "fr-"),
            (ToggleHandler::wing_request(), "wr+", "wr-"),
            (ToggleHandler::system_arrived(), "sys+", "sys-"),
            (ToggleHandler::beacon_spotted(), "bc+", "bc-"),
            (ToggleHandler::instance_successful(), "inst+", "inst-"),
            (ToggleHandler::fueled(), "Client Fueled!", "Client not Fueled!"),
        ];
        for (handler, set, unset) in cases {
            let mut fx = Fixture::new();
            handler
                .handle(&fx.ctx, &payload(handler.field(), "true"))
                .await
                .unwrap();
            handler
                .handle(&fx.ctx, &payload(handler.field(), "false"))
                .await
                .unwrap();
            assert_eq!(
                fx.notices(),
                [
                    format!("Ratty: {set} [Case Ada, RatTracker]"),
                    format!("Ratty: {unset} [Case Ada, RatTracker]"),
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_json_bool_counts_as_set() {
        let mut fx = Fixture::new();
        ToggleHandler::friend_request()
            .handle(&fx.ctx, &payload("FriendRequest", true))
            .await
            .unwrap();
        assert_eq!(fx.notices(), ["Ratty: fr+ [Case Ada, RatTracker]"]);
    }

    #[tokio::test]
    async fn test_capitalized_true_is_unset() {
        let mut fx = Fixture::new();
        ToggleHandler::wing_request()
            .handle(&fx.ctx, &payload("WingRequest", "True"))
            .await
            .unwrap();
        assert_eq!(fx.notices(), ["Ratty: wr- [Case Ada, RatTracker]"]);
    }

    #[tokio::test]
    async fn test_alternate_id_keys() {
        let mut fx = Fixture::new();
        let payload = Payload::default()
            .with("Fueled", "true")
            .with("ratid", "r1")
            .with("rescueId", "c1");
        ToggleHandler::fueled().handle(&fx.ctx, &payload).await.unwrap();
        assert_eq!(fx.notices(), ["Ratty: Client Fueled! [Case Ada, RatTracker]"]);
    }

    #[tokio::test]
    async fn test_missing_ids_read_unknown() {
        let mut fx = Fixture::new();
        let payload = Payload::default().with("BeaconSpotted", "true");
        ToggleHandler::beacon_spotted()
            .handle(&fx.ctx, &payload)
            .await
            .unwrap();
        assert_eq!(fx.notices(), ["unknown: bc+ [Case unknown, RatTracker]"]);
    }

    #[tokio::test]
    async fn test_board_client_name_wins() {
        let mut fx = Fixture::new();
        fx.board.insert(Case::new("Grace").with_id("c1"));
        ToggleHandler::friend_request()
            .handle(&fx.ctx, &payload("FriendRequest", "true"))
            .await
            .unwrap();
        assert_eq!(fx.notices(), ["Ratty: fr+ [Case Grace, RatTracker]"]);
        assert_eq!(fx.names.lookups(), 1);
    }

    #[tokio::test]
    async fn test_missing_flag_is_an_error() {
        let mut fx = Fixture::new();
        let payload = Payload::default().with("RatID", "r1");
        let err = ToggleHandler::fueled()
            .handle(&fx.ctx, &payload)
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::MissingField { field: "Fueled" });
        assert!(fx.notices().is_empty());
    }
}
