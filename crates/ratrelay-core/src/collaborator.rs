//! Interfaces of the API collaborators the handlers call out to.
//!
//! HTTP implementations live in `ratrelay-transport`. [`NoNames`] stands in
//! for the resolver when no API URL is configured.

use std::sync::Arc;

use async_trait::async_trait;

use crate::case::Case;
use crate::error::PersistResult;

/// Name returned when a lookup fails.
pub const UNKNOWN_NAME: &str = "unknown";

/// Persists cases to the rescue API.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Saves a case: update if it has an id, create otherwise.
    ///
    /// Returns the case with the API's response merged in.
    async fn save(&self, case: Case) -> PersistResult<Case>;

    /// Fetches all open cases.
    async fn open_cases(&self) -> PersistResult<Vec<Case>>;
}

/// Boxed case store.
pub type BoxedCaseStore = Arc<dyn CaseStore>;

/// Turns identifiers found in event payloads into display names.
///
/// Lookups never fail; an unresolvable id yields [`UNKNOWN_NAME`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Commander name of a rat.
    async fn rat_name(&self, rat_id: Option<&str>) -> String;

    /// Client name of a rescue.
    async fn client_name(&self, rescue_id: Option<&str>) -> String;

    /// Drops any cached names.
    fn flush(&self) {}
}

/// Boxed name resolver.
pub type BoxedNameResolver = Arc<dyn NameResolver>;

/// Resolver that knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

#[async_trait]
impl NameResolver for NoNames {
    async fn rat_name(&self, _rat_id: Option<&str>) -> String {
        UNKNOWN_NAME.to_string()
    }

    async fn client_name(&self, _rescue_id: Option<&str>) -> String {
        UNKNOWN_NAME.to_string()
    }
}
