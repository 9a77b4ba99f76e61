mod record;
mod view;

pub use record::{IngredientId, IngredientRef, LineItem, RecordId, ShoppingListRecord};
pub use view::{ConsolidatedRow, DateGroup, ListSummary, MergeKey, ProvenanceEntry};
