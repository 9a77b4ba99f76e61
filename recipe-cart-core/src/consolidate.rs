//! Merging raw shopping list records into a date-grouped view.
//!
//! Records are bucketed by the local calendar day of `created_at`. Inside a
//! day, line items that share both ingredient id and unit string are folded
//! into one row whose quantity is the sum of its parts. There is no unit
//! conversion: "g" and "kg" stay separate rows.

use chrono::{Local, NaiveDate, TimeZone};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{
    ConsolidatedRow, DateGroup, LineItem, ListSummary, MergeKey, ProvenanceEntry, RecordId,
    ShoppingListRecord,
};

/// Name shown for items the backend sent without an ingredient name.
pub const UNNAMED_INGREDIENT: &str = "(unnamed)";

/// Consolidate records using the machine's local time zone.
pub fn consolidate(records: &[ShoppingListRecord]) -> Vec<DateGroup> {
    consolidate_in(records, &Local)
}

/// Consolidate records, truncating timestamps to days in `tz`.
///
/// Groups come back most recent first. Rows inside a group are ordered by
/// name (case-insensitive), then unit, then ingredient id.
pub fn consolidate_in<Tz: TimeZone>(records: &[ShoppingListRecord], tz: &Tz) -> Vec<DateGroup> {
    let mut groups: BTreeMap<NaiveDate, GroupBuilder> = BTreeMap::new();

    for record in records {
        let date_key = record.created_at.with_timezone(tz).date_naive();
        groups
            .entry(date_key)
            .or_insert_with(|| GroupBuilder::new(date_key))
            .add_record(record);
    }

    groups.into_values().rev().map(GroupBuilder::finish).collect()
}

/// Merge key for the item at `position` inside record `record_id`.
pub fn merge_key_for(record_id: RecordId, position: usize, item: &LineItem) -> MergeKey {
    match (item.ingredient_id(), item.unit()) {
        (Some(ingredient_id), Some(unit)) => MergeKey::Ingredient {
            ingredient_id,
            unit: unit.to_string(),
        },
        _ => MergeKey::Unkeyed {
            record_id,
            position,
        },
    }
}

struct GroupBuilder {
    date_key: NaiveDate,
    record_ids: BTreeSet<RecordId>,
    titles: Vec<String>,
    lists: Vec<ListSummary>,
    rows: Vec<ConsolidatedRow>,
    index: HashMap<MergeKey, usize>,
}

impl GroupBuilder {
    fn new(date_key: NaiveDate) -> Self {
        Self {
            date_key,
            record_ids: BTreeSet::new(),
            titles: Vec::new(),
            lists: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add_record(&mut self, record: &ShoppingListRecord) {
        self.record_ids.insert(record.id);
        self.lists.push(ListSummary {
            record_id: record.id,
            title: record.title.clone(),
            planned_date: record.planned_date,
            item_count: record.items.len(),
        });

        if let Some(title) = record.title.as_deref().map(str::trim) {
            if !title.is_empty() && !self.titles.iter().any(|t| t == title) {
                self.titles.push(title.to_string());
            }
        }

        for (position, item) in record.items.iter().enumerate() {
            let key = merge_key_for(record.id, position, item);
            let entry = ProvenanceEntry {
                record_id: record.id,
                ingredient_id: item.ingredient_id(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                purchased: item.purchased,
            };

            match self.index.get(&key) {
                Some(&idx) => {
                    let row = &mut self.rows[idx];
                    row.total_quantity += item.quantity;
                    row.purchased = row.purchased && item.purchased;
                    row.provenance.push(entry);
                }
                None => {
                    self.index.insert(key.clone(), self.rows.len());
                    self.rows.push(ConsolidatedRow {
                        merge_key: key,
                        ingredient_id: item.ingredient_id(),
                        unit: item.unit.clone(),
                        name: item.name().unwrap_or(UNNAMED_INGREDIENT).to_string(),
                        total_quantity: item.quantity,
                        purchased: item.purchased,
                        provenance: vec![entry],
                    });
                }
            }
        }
    }

    fn finish(mut self) -> DateGroup {
        self.rows.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.unit.cmp(&b.unit))
                .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
        });

        DateGroup {
            date_key: self.date_key,
            label: self.date_key.format("%d/%m/%Y").to_string(),
            record_ids: self.record_ids,
            titles: self.titles,
            lists: self.lists,
            rows: self.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientId, IngredientRef};
    use chrono::{FixedOffset, Utc};

    fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn record(id: i64, day: u32, items: Vec<LineItem>) -> ShoppingListRecord {
        ShoppingListRecord::new(id, at(day, 9)).with_items(items)
    }

    fn consolidate_utc(records: &[ShoppingListRecord]) -> Vec<DateGroup> {
        consolidate_in(records, &Utc)
    }

    #[test]
    fn test_merges_same_ingredient_and_unit_across_records() {
        let records = vec![
            record(1, 14, vec![LineItem::new(5, "Beef", 200.0, "g")]),
            record(2, 14, vec![LineItem::new(5, "Beef", 100.0, "g")]),
        ];

        let groups = consolidate_utc(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 1);

        let row = &groups[0].rows[0];
        assert_eq!(row.total_quantity, 300.0);
        assert_eq!(row.provenance.len(), 2);
        assert_eq!(row.provenance[0].record_id, RecordId(1));
        assert_eq!(row.provenance[1].record_id, RecordId(2));
        assert_eq!(
            groups[0].record_ids,
            [RecordId(1), RecordId(2)].into_iter().collect()
        );
    }

    #[test]
    fn test_total_matches_sum_of_line_items() {
        let records = vec![
            record(
                1,
                14,
                vec![
                    LineItem::new(5, "Beef", 200.0, "g"),
                    LineItem::new(8, "Onion", 2.0, "pcs"),
                ],
            ),
            record(
                2,
                14,
                vec![
                    LineItem::new(5, "Beef", 150.5, "g"),
                    LineItem::new(8, "Onion", 1.0, "pcs"),
                ],
            ),
            record(3, 14, vec![LineItem::new(8, "Onion", 3.0, "pcs")]),
        ];

        let groups = consolidate_utc(&records);
        for row in &groups[0].rows {
            let expected: f64 = records
                .iter()
                .flat_map(|r| r.items.iter())
                .filter(|i| i.ingredient_id() == row.ingredient_id && i.unit == row.unit)
                .map(|i| i.quantity)
                .sum();
            assert_eq!(row.total_quantity, expected);
            let provenance_sum: f64 = row.provenance.iter().map(|p| p.quantity).sum();
            assert_eq!(row.total_quantity, provenance_sum);
        }
    }

    #[test]
    fn test_different_units_never_merge() {
        let records = vec![
            record(1, 14, vec![LineItem::new(5, "Beef", 200.0, "g")]),
            record(2, 14, vec![LineItem::new(5, "Beef", 1.0, "kg")]),
        ];

        let groups = consolidate_utc(&records);
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[0].rows[0].unit.as_deref(), Some("g"));
        assert_eq!(groups[0].rows[1].unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_composite_key_does_not_collide() {
        // "1" + "0g" and "10" + "g" concatenate to the same string
        let records = vec![record(
            1,
            14,
            vec![
                LineItem::new(1, "Salt", 1.0, "0g"),
                LineItem::new(10, "Sugar", 1.0, "g"),
            ],
        )];

        let groups = consolidate_utc(&records);
        assert_eq!(groups[0].rows.len(), 2);
    }

    #[test]
    fn test_purchased_is_and_of_contributors() {
        let records = vec![
            record(
                1,
                14,
                vec![LineItem::new(5, "Beef", 200.0, "g").purchased(false)],
            ),
            record(
                2,
                14,
                vec![LineItem::new(5, "Beef", 100.0, "g").purchased(true)],
            ),
        ];

        let row = &consolidate_utc(&records)[0].rows[0];
        assert_eq!(row.total_quantity, 300.0);
        assert!(!row.purchased);
        assert!(row.is_partially_purchased());

        let all_bought = vec![
            record(1, 14, vec![LineItem::new(5, "Beef", 200.0, "g").purchased(true)]),
            record(2, 14, vec![LineItem::new(5, "Beef", 100.0, "g").purchased(true)]),
        ];
        assert!(consolidate_utc(&all_bought)[0].rows[0].purchased);
    }

    #[test]
    fn test_groups_by_day_most_recent_first() {
        let records = vec![
            record(1, 12, vec![LineItem::new(5, "Beef", 1.0, "kg")]),
            record(2, 14, vec![LineItem::new(5, "Beef", 1.0, "kg")]),
            record(3, 13, vec![LineItem::new(5, "Beef", 1.0, "kg")]),
        ];

        let groups = consolidate_utc(&records);
        let days: Vec<_> = groups.iter().map(|g| g.date_key.to_string()).collect();
        assert_eq!(days, vec!["2026-01-14", "2026-01-13", "2026-01-12"]);
        assert_eq!(groups[0].label, "14/01/2026");

        // Same ingredient on different days stays separate
        assert!(groups.iter().all(|g| g.rows.len() == 1));
        assert!(groups.iter().all(|g| g.rows[0].total_quantity == 1.0));
    }

    #[test]
    fn test_day_boundary_follows_time_zone() {
        let late = ShoppingListRecord::new(1, at(14, 20))
            .with_items(vec![LineItem::new(5, "Beef", 1.0, "kg")]);
        let early = ShoppingListRecord::new(2, at(15, 2))
            .with_items(vec![LineItem::new(5, "Beef", 1.0, "kg")]);
        let records = vec![late, early];

        // Separate days in UTC
        assert_eq!(consolidate_in(&records, &Utc).len(), 2);

        // 03:00 and 09:00 on the 15th at UTC+7
        let hanoi = FixedOffset::east_opt(7 * 3600).unwrap();
        let groups = consolidate_in(&records, &hanoi);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date_key, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(groups[0].rows[0].total_quantity, 2.0);
    }

    #[test]
    fn test_malformed_items_stay_separate() {
        let no_id = LineItem {
            ingredient: Some(IngredientRef {
                id: None,
                name: Some("Mystery".to_string()),
            }),
            quantity: 1.0,
            unit: Some("g".to_string()),
            purchased: false,
        };
        let no_unit = LineItem {
            ingredient: Some(IngredientRef {
                id: Some(IngredientId(5)),
                name: Some("Beef".to_string()),
            }),
            quantity: 2.0,
            unit: None,
            purchased: false,
        };
        let no_ingredient = LineItem {
            ingredient: None,
            quantity: 3.0,
            unit: None,
            purchased: false,
        };

        let records = vec![
            record(1, 14, vec![no_id.clone(), no_unit.clone(), no_ingredient]),
            record(2, 14, vec![no_id, no_unit]),
        ];

        let groups = consolidate_utc(&records);
        let rows = &groups[0].rows;
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.merge_key.is_unkeyed()));
        assert!(rows.iter().all(|r| r.provenance.len() == 1));
        assert!(rows.iter().any(|r| r.name == UNNAMED_INGREDIENT));
    }

    #[test]
    fn test_rows_sorted_by_name() {
        let records = vec![record(
            1,
            14,
            vec![
                LineItem::new(3, "onion", 1.0, "pcs"),
                LineItem::new(1, "Beef", 1.0, "kg"),
                LineItem::new(2, "Garlic", 1.0, "pcs"),
            ],
        )];

        let names: Vec<_> = consolidate_utc(&records)[0]
            .rows
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, vec!["Beef", "Garlic", "onion"]);
    }

    #[test]
    fn test_titles_deduplicated_in_order() {
        let records = vec![
            record(1, 14, vec![]).with_title("Pho bo"),
            record(2, 14, vec![]).with_title("Bun cha"),
            record(3, 14, vec![]).with_title("Pho bo"),
            record(4, 14, vec![]).with_title("  "),
        ];

        let groups = consolidate_utc(&records);
        assert_eq!(groups[0].titles, vec!["Pho bo", "Bun cha"]);
        assert_eq!(groups[0].record_ids.len(), 4);
        assert!(groups[0].rows.is_empty());
    }

    #[test]
    fn test_lists_keep_each_record() {
        let planned = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let records = vec![
            record(1, 14, vec![LineItem::new(5, "Beef", 200.0, "g")])
                .with_title("Pho bo")
                .with_planned_date(planned),
            record(2, 14, vec![]).with_title("Pho bo"),
        ];

        let lists = &consolidate_utc(&records)[0].lists;
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].record_id, RecordId(1));
        assert_eq!(lists[0].planned_date, Some(planned));
        assert_eq!(lists[0].item_count, 1);
        assert_eq!(lists[1].title.as_deref(), Some("Pho bo"));
        assert_eq!(lists[1].planned_date, None);
    }

    #[test]
    fn test_consolidate_is_deterministic() {
        let records = vec![
            record(1, 14, vec![LineItem::new(5, "Beef", 200.0, "g")]),
            record(2, 13, vec![LineItem::new(6, "Rice", 1.0, "kg")]),
            record(3, 14, vec![LineItem::new(5, "Beef", 50.0, "g").purchased(true)]),
        ];

        assert_eq!(consolidate_utc(&records), consolidate_utc(&records));
        assert_eq!(consolidate(&records), consolidate(&records));
    }

    #[test]
    fn test_empty_input() {
        assert!(consolidate_utc(&[]).is_empty());
    }
}
