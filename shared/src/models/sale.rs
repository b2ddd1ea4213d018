//! Destination-local sale models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle of a sale. Settlement itself happens outside the
/// ledger; this flag is sale data only and has no stock effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Unpaid,
    Paid,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Unpaid => "unpaid",
            SaleStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(SaleStatus::Unpaid),
            "paid" => Some(SaleStatus::Paid),
            _ => None,
        }
    }
}

/// Header of a sale recorded against a destination's own stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub destination_id: Uuid,
    pub destination_name: String,
    pub sale_date: NaiveDate,
    pub status: SaleStatus,
    pub voided_at: Option<DateTime<Utc>>,
    pub total: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

/// One sold item line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Full sale view: header plus lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}
