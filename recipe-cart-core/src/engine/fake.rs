//! In-memory shopping list backend for engine tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::watch;

use super::ViewState;
use crate::models::{IngredientRef, LineItem, RecordId, ShoppingListRecord};
use crate::remote::{ApiError, LineItemUpdate, ShoppingListService};

/// Two records on Jan 14 sharing "Beef (g)", one record on Jan 10.
pub(crate) fn sample_records() -> Vec<ShoppingListRecord> {
    vec![
        ShoppingListRecord::new(1, Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap())
            .with_title("Pho bo")
            .with_items(vec![
                LineItem::new(5, "Beef", 200.0, "g"),
                LineItem::new(8, "Onion", 2.0, "pcs"),
            ]),
        ShoppingListRecord::new(2, Utc.with_ymd_and_hms(2026, 1, 14, 12, 5, 0).unwrap())
            .with_title("Bo luc lac")
            .with_items(vec![
                LineItem::new(5, "Beef", 100.0, "g"),
                LineItem::new(6, "Rice", 1.0, "kg"),
            ]),
        ShoppingListRecord::new(3, Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap())
            .with_title("Bo kho")
            .with_items(vec![LineItem::new(5, "Beef", 1.0, "kg")]),
    ]
}

#[derive(Default)]
struct FakeState {
    records: Vec<ShoppingListRecord>,
    fail_fetch: bool,
    failing_records: HashSet<RecordId>,
    hang_writes: bool,
    fetch_count: usize,
    updates: Vec<LineItemUpdate>,
    deletes: Vec<RecordId>,
    observer: Option<watch::Receiver<ViewState>>,
    observed: Vec<ViewState>,
}

pub(crate) struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub(crate) fn new(records: Vec<ShoppingListRecord>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                records,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn records(&self) -> Vec<ShoppingListRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch = fail;
    }

    /// Writes touching this record return a server error.
    pub(crate) fn fail_writes_for(&self, id: i64) {
        self.state.lock().unwrap().failing_records.insert(RecordId(id));
    }

    /// Remove a record on the server side only, as another device would.
    pub(crate) fn drop_record(&self, id: i64) {
        self.state
            .lock()
            .unwrap()
            .records
            .retain(|r| r.id != RecordId(id));
    }

    /// Writes never complete.
    pub(crate) fn hang_writes(&self) {
        self.state.lock().unwrap().hang_writes = true;
    }

    /// Capture the published view each time a write arrives.
    pub(crate) fn observe(&self, rx: watch::Receiver<ViewState>) {
        self.state.lock().unwrap().observer = Some(rx);
    }

    pub(crate) fn observed(&self) -> Vec<ViewState> {
        self.state.lock().unwrap().observed.clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetch_count
    }

    pub(crate) fn updates(&self) -> Vec<LineItemUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    pub(crate) fn deletes(&self) -> Vec<RecordId> {
        self.state.lock().unwrap().deletes.clone()
    }
}

impl FakeState {
    fn observe(&mut self) {
        if let Some(rx) = &self.observer {
            let snapshot = rx.borrow().clone();
            self.observed.push(snapshot);
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            body: "injected failure".to_string(),
        }
    }

    fn apply_update(&mut self, update: &LineItemUpdate) -> Result<(), ApiError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == update.record_id)
            .ok_or(ApiError::Status {
                status: 404,
                body: "shopping list not found".to_string(),
            })?;

        match record
            .items
            .iter_mut()
            .find(|i| i.ingredient_id() == Some(update.ingredient_id) && i.unit == update.unit)
        {
            Some(item) => {
                item.quantity = update.quantity;
                item.purchased = update.purchased;
            }
            None => record.items.push(LineItem {
                ingredient: Some(IngredientRef {
                    id: Some(update.ingredient_id),
                    name: None,
                }),
                quantity: update.quantity,
                unit: update.unit.clone(),
                purchased: update.purchased,
            }),
        }
        Ok(())
    }
}

#[async_trait]
impl ShoppingListService for FakeService {
    async fn fetch_records(&self) -> Result<Vec<ShoppingListRecord>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.fetch_count += 1;
        if state.fail_fetch {
            return Err(FakeState::server_error());
        }
        Ok(state.records.clone())
    }

    async fn update_item(&self, update: &LineItemUpdate) -> Result<(), ApiError> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state.updates.push(update.clone());
            state.observe();
            state.hang_writes
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_records.contains(&update.record_id) {
            return Err(FakeState::server_error());
        }
        state.apply_update(update)
    }

    async fn delete_record(&self, id: RecordId) -> Result<(), ApiError> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state.deletes.push(id);
            state.observe();
            state.hang_writes
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_records.contains(&id) {
            return Err(FakeState::server_error());
        }
        state.records.retain(|r| r.id != id);
        Ok(())
    }
}
