//! Issuance (store-to-destination transfer) models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header of a stock transfer from the store to a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issuance {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub destination_name: String,
    pub issue_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One item line within an issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceLine {
    pub id: Uuid,
    pub issuance_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
}

/// Persisted record of how much a consuming event took from which lot.
/// The walk `position` preserves the order lots were drained in; reversal
/// replays these rows exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotConsumption {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub position: i32,
}

/// An issuance line together with its recorded lot breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceLineDetail {
    #[serde(flatten)]
    pub line: IssuanceLine,
    pub consumed_lots: Vec<LotConsumption>,
}

/// Full issuance view: header plus lines plus breakdowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceDetail {
    #[serde(flatten)]
    pub issuance: Issuance,
    pub lines: Vec<IssuanceLineDetail>,
}
