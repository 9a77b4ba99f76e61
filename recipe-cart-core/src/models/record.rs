//! Shopping list records as the backend stores them.
//!
//! A record is created every time the user adds a recipe to their list, so
//! one day can hold several records that mention the same ingredient. The
//! records are owned by the backend; the client only caches them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backend id of a shopping list record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend id of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(pub i64);

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingredient reference nested inside a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IngredientRef {
    #[serde(default)]
    pub id: Option<IngredientId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One ingredient line inside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub ingredient: Option<IngredientRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purchased: bool,
}

impl LineItem {
    /// Create a well-formed line item.
    pub fn new(
        ingredient_id: i64,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            ingredient: Some(IngredientRef {
                id: Some(IngredientId(ingredient_id)),
                name: Some(name.into()),
            }),
            quantity,
            unit: Some(unit.into()),
            purchased: false,
        }
    }

    pub fn purchased(mut self, purchased: bool) -> Self {
        self.purchased = purchased;
        self
    }

    pub fn ingredient_id(&self) -> Option<IngredientId> {
        self.ingredient.as_ref().and_then(|i| i.id)
    }

    pub fn name(&self) -> Option<&str> {
        self.ingredient.as_ref().and_then(|i| i.name.as_deref())
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// A shopping list record for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListRecord {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<LineItem>,
}

impl ShoppingListRecord {
    pub fn new(id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RecordId(id),
            title: None,
            planned_date: None,
            created_at,
            items: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_planned_date(mut self, date: NaiveDate) -> Self {
        self.planned_date = Some(date);
        self
    }

    pub fn with_items(mut self, items: Vec<LineItem>) -> Self {
        self.items = items;
        self
    }
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts RFC 3339 timestamps as well as zone-less ones, which are read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid createdAt '{}': {}", raw, e)))
}
