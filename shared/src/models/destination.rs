//! Destination (bar/kitchen) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of sub-location stock can be issued to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Bar,
    Kitchen,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Bar => "bar",
            DestinationKind::Kitchen => "kitchen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bar" => Some(DestinationKind::Bar),
            "kitchen" => Some(DestinationKind::Kitchen),
            _ => None,
        }
    }
}

/// A named sub-location holding issued stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub kind: DestinationKind,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Running stock counter for one item at one destination
///
/// A cache over issuance/sale/adjustment events, kept consistent by
/// writing it in the same transaction as the event that moves it. It is
/// authoritative only for what the destination currently holds, never for
/// origin-side remaining stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationStock {
    pub destination_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub selling_price: Decimal,
    pub updated_at: DateTime<Utc>,
}
