//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use ratrelay_core::{
    Case, CaseBoard, CaseStore, ChannelSink, NameResolver, PersistError, PersistResult,
    UNKNOWN_NAME,
};
use tokio::sync::mpsc;

use crate::handler::HandlerContext;
use crate::persister::CasePersister;

/// Store that records saves and stamps an `updatedAt`.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub(crate) saved: Mutex<Vec<Case>>,
    pub(crate) fail: bool,
}

#[async_trait]
impl CaseStore for RecordingStore {
    async fn save(&self, mut case: Case) -> PersistResult<Case> {
        self.saved.lock().push(case.clone());
        if self.fail {
            return Err(PersistError::UnusableResponse);
        }
        case.updated_at = Some("2026-01-01T00:00:00Z".into());
        Ok(case)
    }

    async fn open_cases(&self) -> PersistResult<Vec<Case>> {
        Ok(Vec::new())
    }
}

/// Resolver backed by two maps, counting every lookup.
#[derive(Default)]
pub(crate) struct FakeNames {
    rats: HashMap<String, String>,
    clients: HashMap<String, String>,
    pub(crate) lookups: AtomicUsize,
}

impl FakeNames {
    pub(crate) fn with_rat(mut self, id: &str, name: &str) -> Self {
        self.rats.insert(id.into(), name.into());
        self
    }

    pub(crate) fn with_client(mut self, id: &str, name: &str) -> Self {
        self.clients.insert(id.into(), name.into());
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for FakeNames {
    async fn rat_name(&self, rat_id: Option<&str>) -> String {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        rat_id
            .and_then(|id| self.rats.get(id).cloned())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    async fn client_name(&self, rescue_id: Option<&str>) -> String {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        rescue_id
            .and_then(|id| self.clients.get(id).cloned())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }
}

/// A handler context wired to fakes.
pub(crate) struct Fixture {
    pub(crate) ctx: HandlerContext,
    pub(crate) board: Arc<CaseBoard>,
    pub(crate) store: Arc<RecordingStore>,
    pub(crate) names: Arc<FakeNames>,
    notices: mpsc::UnboundedReceiver<String>,
}

impl Fixture {
    /// Knows rat `r1` as "Ratty" and rescue `c1` as "Ada".
    pub(crate) fn new() -> Self {
        let (sink, notices) = ChannelSink::new();
        let board = Arc::new(CaseBoard::new());
        let store = Arc::new(RecordingStore::default());
        let names = Arc::new(
            FakeNames::default()
                .with_rat("r1", "Ratty")
                .with_client("c1", "Ada"),
        );
        let persister = CasePersister::new(store.clone(), board.clone());
        let ctx = HandlerContext::new(Arc::new(sink), board.clone(), names.clone(), persister);
        Self {
            ctx,
            board,
            store,
            names,
            notices,
        }
    }

    /// Drains the notices emitted so far.
    pub(crate) fn notices(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(text) = self.notices.try_recv() {
            out.push(text);
        }
        out
    }
}
