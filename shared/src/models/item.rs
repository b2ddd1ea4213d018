//! Stock item models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a stock item, deciding which part of the operation
/// usually consumes it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Bar,
    Kitchen,
    General,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Bar => "bar",
            ItemType::Kitchen => "kitchen",
            ItemType::General => "general",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bar" => Some(ItemType::Bar),
            "kitchen" => Some(ItemType::Kitchen),
            "general" => Some(ItemType::General),
            _ => None,
        }
    }
}

/// A stock-keeping unit
///
/// `unit_price` is the informational reference price; the authoritative
/// price of stock on hand lives on each purchase lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub item_type: ItemType,
    pub unit_price: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
