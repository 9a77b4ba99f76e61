//! Consolidated shopping list view.
//!
//! These types are derived from the raw records on every load and are never
//! sent back to the backend. Each row remembers the line items it was built
//! from so that a single toggle can be fanned out to every backing record.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::record::{IngredientId, RecordId};

/// Identifies which line items fold into the same row of a day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeKey {
    /// Same ingredient with the exact same unit string.
    Ingredient {
        ingredient_id: IngredientId,
        unit: String,
    },
    /// Item without an ingredient id or unit. Never merges with anything.
    Unkeyed { record_id: RecordId, position: usize },
}

impl MergeKey {
    pub fn is_unkeyed(&self) -> bool {
        matches!(self, MergeKey::Unkeyed { .. })
    }
}

/// One line item that contributed to a consolidated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceEntry {
    pub record_id: RecordId,
    pub ingredient_id: Option<IngredientId>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub purchased: bool,
}

/// A de-duplicated ingredient line within one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRow {
    pub merge_key: MergeKey,
    pub ingredient_id: Option<IngredientId>,
    pub unit: Option<String>,
    pub name: String,
    /// Sum of all provenance quantities
    pub total_quantity: f64,
    /// True only when every contributing item is purchased
    pub purchased: bool,
    pub provenance: Vec<ProvenanceEntry>,
}

impl ConsolidatedRow {
    /// Some, but not all, contributing items are purchased.
    pub fn is_partially_purchased(&self) -> bool {
        !self.purchased && self.provenance.iter().any(|p| p.purchased)
    }

    pub fn contributor_count(&self) -> usize {
        self.provenance.len()
    }
}

impl fmt::Display for ConsolidatedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.purchased {
            "[x]"
        } else if self.is_partially_purchased() {
            "[~]"
        } else {
            "[ ]"
        };
        let quantity = format_quantity(self.total_quantity);
        match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => {
                write!(f, "{} {:<20} {} {}", check, self.name, quantity, unit)
            }
            _ => write!(f, "{} {:<20} {}", check, self.name, quantity),
        }
    }
}

/// At most two decimals, no trailing zeros.
fn format_quantity(qty: f64) -> String {
    if qty.fract() == 0.0 {
        format!("{}", qty as i64)
    } else {
        format!("{:.2}", qty)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// One backing record of a day, as shown next to the merged rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSummary {
    pub record_id: RecordId,
    pub title: Option<String>,
    /// Day the recipe is planned for, when the backend has one
    pub planned_date: Option<NaiveDate>,
    pub item_count: usize,
}

/// All records created on the same local calendar day, merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub date_key: NaiveDate,
    /// Day formatted as dd/mm/yyyy
    pub label: String,
    pub record_ids: BTreeSet<RecordId>,
    /// Distinct record titles, in input order
    pub titles: Vec<String>,
    /// Backing records, in input order
    pub lists: Vec<ListSummary>,
    pub rows: Vec<ConsolidatedRow>,
}

impl DateGroup {
    pub fn row(&self, key: &MergeKey) -> Option<&ConsolidatedRow> {
        self.rows.iter().find(|r| &r.merge_key == key)
    }

    pub fn pending_rows(&self) -> impl Iterator<Item = &ConsolidatedRow> {
        self.rows.iter().filter(|r| !r.purchased)
    }

    pub fn purchased_rows(&self) -> impl Iterator<Item = &ConsolidatedRow> {
        self.rows.iter().filter(|r| r.purchased)
    }
}
