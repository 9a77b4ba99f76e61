//! Engine error types.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::RecordId;
use crate::remote::ApiError;

/// Errors surfaced by [`ShoppingListEngine`](super::ShoppingListEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The record list could not be read. Nothing is retried automatically.
    #[error("Failed to load shopping lists: {0}")]
    Fetch(#[source] ApiError),

    /// At least one line item update failed after the optimistic change.
    #[error(
        "{failed} of {attempted} item update(s) failed, {}",
        resync_note(.resynced)
    )]
    ToggleSync {
        failed: usize,
        attempted: usize,
        resynced: bool,
    },

    /// At least one record deletion failed after the optimistic removal.
    #[error(
        "{failed} of {attempted} list deletion(s) failed, {}",
        resync_note(.resynced)
    )]
    DeleteSync {
        failed: usize,
        attempted: usize,
        resynced: bool,
    },

    #[error("No item '{name}' in the shopping list for {date}")]
    RowNotFound { date: NaiveDate, name: String },

    #[error("No shopping list for {0}")]
    GroupNotFound(NaiveDate),

    #[error("No shopping list with id {0}")]
    RecordNotFound(RecordId),

    /// The row is backed by an item without an ingredient id.
    #[error("Item '{0}' has no ingredient id and cannot be updated")]
    Unaddressable(String),

    #[error("Operation cancelled")]
    Cancelled,
}

fn resync_note(resynced: &bool) -> &'static str {
    if *resynced {
        "list reloaded from server"
    } else {
        "list could not be reloaded and may be out of date"
    }
}
