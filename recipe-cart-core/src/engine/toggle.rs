//! Purchased-flag toggling for consolidated rows.

use futures::future::join_all;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

use super::{EngineError, ShoppingListEngine, SyncPhase};
use crate::consolidate::merge_key_for;
use crate::models::{ConsolidatedRow, DateGroup, MergeKey, RecordId};
use crate::remote::{LineItemUpdate, ShoppingListService};

impl<S: ShoppingListService> ShoppingListEngine<S> {
    /// Set the purchased flag of a row on every record that contributed to it.
    ///
    /// The row is looked up by its group's day and merge key in the engine's
    /// current view. One upsert is sent per provenance entry, in parallel.
    /// On any failure the whole view is reloaded from the server.
    pub async fn toggle_row(
        &mut self,
        row: &ConsolidatedRow,
        group: &DateGroup,
        purchased: bool,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let (updates, record_ids) = self.plan_toggle(row, group, purchased)?;

        // Optimistic phase: no network call has been made yet
        self.apply_purchased(&record_ids, &row.merge_key, purchased);
        self.rebuild_view();
        self.set_phase(SyncPhase::Optimistic);

        self.set_phase(SyncPhase::Syncing);
        tracing::debug!(
            "Sending {} item update(s) for '{}' on {}",
            updates.len(),
            row.name,
            group.date_key
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            results = join_all(updates.iter().map(|u| self.service.update_item(u))) => Some(results),
        };
        let Some(results) = outcome else {
            self.abandon();
            return Err(EngineError::Cancelled);
        };

        let attempted = results.len();
        let mut failed = 0;
        for (update, result) in updates.iter().zip(&results) {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(
                    "Updating ingredient {} on list {} failed: {}",
                    update.ingredient_id,
                    update.record_id,
                    e
                );
            }
        }

        if failed == 0 {
            self.set_phase(SyncPhase::Confirmed);
            tracing::info!(
                "Marked '{}' as {} on {} list(s)",
                row.name,
                if purchased { "purchased" } else { "pending" },
                attempted
            );
            return Ok(());
        }

        match self.resync(cancel).await {
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            resynced => Err(EngineError::ToggleSync {
                failed,
                attempted,
                resynced: resynced.is_ok(),
            }),
        }
    }

    /// Builds the upsert payloads and collects the records of the target day.
    fn plan_toggle(
        &self,
        row: &ConsolidatedRow,
        group: &DateGroup,
        purchased: bool,
    ) -> Result<(Vec<LineItemUpdate>, BTreeSet<RecordId>), EngineError> {
        let current = self
            .find_group(group.date_key)
            .ok_or(EngineError::GroupNotFound(group.date_key))?;
        let current_row = current
            .row(&row.merge_key)
            .ok_or_else(|| EngineError::RowNotFound {
                date: group.date_key,
                name: row.name.clone(),
            })?;

        let updates = current_row
            .provenance
            .iter()
            .map(|entry| {
                let ingredient_id = entry
                    .ingredient_id
                    .ok_or_else(|| EngineError::Unaddressable(current_row.name.clone()))?;
                Ok(LineItemUpdate {
                    record_id: entry.record_id,
                    ingredient_id,
                    quantity: entry.quantity,
                    unit: entry.unit.clone(),
                    purchased,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok((updates, current.record_ids.clone()))
    }

    /// Sets `purchased` on every local item folded into `key` within the given records.
    fn apply_purchased(&mut self, record_ids: &BTreeSet<RecordId>, key: &MergeKey, purchased: bool) {
        for record in self
            .records
            .iter_mut()
            .filter(|r| record_ids.contains(&r.id))
        {
            let record_id = record.id;
            for (position, item) in record.items.iter_mut().enumerate() {
                if merge_key_for(record_id, position, item) == *key {
                    item.purchased = purchased;
                }
            }
        }
    }
}
