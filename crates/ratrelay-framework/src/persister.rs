//! Fire-and-forget case persistence.
//!
//! Handlers hand updated cases to the [`CasePersister`] and return
//! immediately; the save runs on its own task. A successful save writes the
//! API's view of the case back onto the board, unless the case was dropped
//! or changed locally while the save was in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ratrelay_core::{BoxedCaseStore, Case, CaseBoard};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Submits case saves without waiting on them.
#[derive(Clone)]
pub struct CasePersister {
    store: Option<BoxedCaseStore>,
    board: Arc<CaseBoard>,
    tracker: TaskTracker,
    submitted: Arc<AtomicUsize>,
}

impl CasePersister {
    /// Creates a persister saving through `store`.
    pub fn new(store: BoxedCaseStore, board: Arc<CaseBoard>) -> Self {
        Self {
            store: Some(store),
            board,
            tracker: TaskTracker::new(),
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a persister that logs and skips every submission.
    pub fn disabled(board: Arc<CaseBoard>) -> Self {
        Self {
            store: None,
            board,
            tracker: TaskTracker::new(),
            submitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns true if saves actually reach a store.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Queues a save of `case`. Must be called from within a tokio runtime.
    ///
    /// Returns `false` if persistence is disabled.
    pub fn submit(&self, case: Case) -> bool {
        let Some(store) = self.store.clone() else {
            debug!(case_id = ?case.id, "Case persistence disabled, not saving");
            return false;
        };
        self.submitted.fetch_add(1, Ordering::Relaxed);

        let board = Arc::clone(&self.board);
        self.tracker.spawn(async move {
            let case_id = case.id.clone();
            match store.save(case.clone()).await {
                Ok(saved) => {
                    info!(case_id = ?saved.id, "Case saved");
                    if !board.refresh(&case, saved) {
                        debug!(case_id = ?case_id, "Case changed or untracked since submit, keeping board");
                    }
                }
                Err(e) => {
                    warn!(case_id = ?case_id, error = %e, "Failed to save case");
                }
            }
        });
        true
    }

    /// Number of saves submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Number of saves still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every submitted save to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl std::fmt::Debug for CasePersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasePersister")
            .field("enabled", &self.is_enabled())
            .field("submitted", &self.submitted())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
