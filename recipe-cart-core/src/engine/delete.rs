//! Deleting shopping lists, one record or a whole day at a time.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::{EngineError, ShoppingListEngine, SyncPhase};
use crate::models::{DateGroup, RecordId};
use crate::remote::ShoppingListService;

impl<S: ShoppingListService> ShoppingListEngine<S> {
    /// Delete every record in a day's group.
    ///
    /// The group disappears from the view immediately. One delete is sent
    /// per record id, in parallel; if any fails the view is reloaded and the
    /// records that survived show up again.
    pub async fn delete_group(
        &mut self,
        group: &DateGroup,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let record_ids: Vec<RecordId> = self
            .find_group(group.date_key)
            .ok_or(EngineError::GroupNotFound(group.date_key))?
            .record_ids
            .iter()
            .copied()
            .collect();

        self.delete_records(record_ids, cancel).await
    }

    /// Delete a single record. Its rows drop out of the day's merged totals
    /// right away, and come back if the server refuses.
    pub async fn delete_record(
        &mut self,
        id: RecordId,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if !self.records.iter().any(|r| r.id == id) {
            return Err(EngineError::RecordNotFound(id));
        }

        self.delete_records(vec![id], cancel).await
    }

    async fn delete_records(
        &mut self,
        record_ids: Vec<RecordId>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.records.retain(|r| !record_ids.contains(&r.id));
        self.rebuild_view();
        self.set_phase(SyncPhase::Optimistic);

        self.set_phase(SyncPhase::Syncing);
        tracing::debug!("Deleting {} record(s)", record_ids.len());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            results = join_all(record_ids.iter().map(|id| self.service.delete_record(*id))) => Some(results),
        };
        let Some(results) = outcome else {
            self.abandon();
            return Err(EngineError::Cancelled);
        };

        let attempted = results.len();
        let mut failed = 0;
        for (id, result) in record_ids.iter().zip(&results) {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!("Deleting list {} failed: {}", id, e);
            }
        }

        if failed == 0 {
            self.set_phase(SyncPhase::Confirmed);
            tracing::info!("Deleted {} list(s)", attempted);
            return Ok(());
        }

        match self.resync(cancel).await {
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            resynced => Err(EngineError::DeleteSync {
                failed,
                attempted,
                resynced: resynced.is_ok(),
            }),
        }
    }
}
