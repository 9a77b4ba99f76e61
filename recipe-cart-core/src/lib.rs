//! Recipe Cart Core Library
//!
//! Shopping list consolidation and synchronization for the recipe app.
//! Raw per-recipe shopping lists are merged into one de-duplicated view
//! per day, and purchase toggles or day deletions on that view are pushed
//! back to every backend record behind it.

pub mod consolidate;
pub mod engine;
pub mod models;
pub mod remote;

pub use consolidate::{consolidate, consolidate_in};
pub use engine::{EngineError, ShoppingListEngine, SyncPhase, ViewState};
pub use models::{
    ConsolidatedRow, DateGroup, IngredientId, IngredientRef, LineItem, ListSummary, MergeKey,
    ProvenanceEntry, RecordId, ShoppingListRecord,
};
pub use remote::{
    ApiError, HttpShoppingListService, LineItemUpdate, ShoppingListService, DEFAULT_TIMEOUT,
};
pub use tokio_util::sync::CancellationToken;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
