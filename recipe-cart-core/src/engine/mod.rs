//! Shopping list engine.
//!
//! [`ShoppingListEngine`] owns the user's raw records and the consolidated
//! view derived from them. It is the only thing that mutates either. Every
//! write follows the same cycle:
//!
//! ```text
//! Idle -> Optimistic -> Syncing -> Confirmed
//!                               \-> Resyncing -> Idle
//! ```
//!
//! The optimistic change is applied locally and published before any
//! network call is made. If every remote call succeeds the local state is
//! final. If any call fails, local state is thrown away and rebuilt from a
//! fresh fetch, so the view always ends up matching the server even when
//! only some of the backing records were changed.
//!
//! Each operation takes a [`CancellationToken`]. Cancelling drops the
//! in-flight requests and leaves the engine marked stale until the next
//! successful load.

mod delete;
mod error;
#[cfg(test)]
mod fake;
mod toggle;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::consolidate::consolidate;
use crate::models::{ConsolidatedRow, DateGroup, MergeKey, ShoppingListRecord};
use crate::remote::ShoppingListService;

pub use error::EngineError;

/// Where the engine is in its optimistic update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Local change applied, remote calls not yet issued
    Optimistic,
    /// Waiting on remote calls
    Syncing,
    /// All remote calls succeeded
    Confirmed,
    /// A remote call failed, reloading from the server
    Resyncing,
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewState {
    pub phase: SyncPhase,
    pub stale: bool,
    pub groups: Vec<DateGroup>,
}

/// State container for the consolidated shopping list.
pub struct ShoppingListEngine<S> {
    service: S,
    records: Vec<ShoppingListRecord>,
    groups: Vec<DateGroup>,
    phase: SyncPhase,
    stale: bool,
    view_tx: watch::Sender<ViewState>,
}

impl<S: ShoppingListService> ShoppingListEngine<S> {
    pub fn new(service: S) -> Self {
        let (view_tx, _) = watch::channel(ViewState::default());
        Self {
            service,
            records: Vec::new(),
            groups: Vec::new(),
            phase: SyncPhase::Idle,
            stale: false,
            view_tx,
        }
    }

    /// Receive a new [`ViewState`] after every change, optimistic ones included.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Current consolidated view, most recent day first.
    pub fn view(&self) -> &[DateGroup] {
        &self.groups
    }

    pub fn records(&self) -> &[ShoppingListRecord] {
        &self.records
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// True when local state may not match the server (cancelled or failed resync).
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn find_group(&self, date_key: NaiveDate) -> Option<&DateGroup> {
        self.groups.iter().find(|g| g.date_key == date_key)
    }

    pub fn find_row(&self, date_key: NaiveDate, key: &MergeKey) -> Option<&ConsolidatedRow> {
        self.find_group(date_key).and_then(|g| g.row(key))
    }

    /// Fetch all records and rebuild the view from scratch.
    pub async fn load_view(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DateGroup>, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.service.fetch_records() => Some(result),
        };

        match fetched {
            None => Err(EngineError::Cancelled),
            Some(Err(e)) => {
                tracing::warn!("Loading shopping lists failed: {}", e);
                Err(EngineError::Fetch(e))
            }
            Some(Ok(records)) => {
                self.replace_records(records);
                self.stale = false;
                self.set_phase(SyncPhase::Idle);
                tracing::info!(
                    "Loaded {} record(s) into {} day(s)",
                    self.records.len(),
                    self.groups.len()
                );
                Ok(self.groups.clone())
            }
        }
    }

    /// Discard local state and reload it from the server.
    async fn resync(&mut self, cancel: &CancellationToken) -> Result<(), EngineError> {
        self.set_phase(SyncPhase::Resyncing);

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.service.fetch_records() => Some(result),
        };

        let outcome = match fetched {
            None => Err(EngineError::Cancelled),
            Some(Err(e)) => {
                tracing::warn!("Resync failed, view may be out of date: {}", e);
                Err(EngineError::Fetch(e))
            }
            Some(Ok(records)) => {
                self.replace_records(records);
                Ok(())
            }
        };

        self.stale = outcome.is_err();
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    /// Marks local state as abandoned after a cancellation mid-sync.
    fn abandon(&mut self) {
        tracing::debug!("Sync cancelled, local state marked stale");
        self.stale = true;
        self.set_phase(SyncPhase::Idle);
    }

    fn replace_records(&mut self, records: Vec<ShoppingListRecord>) {
        self.records = records;
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        self.groups = consolidate(&self.records);
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.view_tx.send_replace(ViewState {
            phase: self.phase,
            stale: self.stale,
            groups: self.groups.clone(),
        });
    }
}
