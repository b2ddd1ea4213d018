//! Purchase lot models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchase batch of an item
///
/// `remaining_quantity` only moves downward through consumption and upward
/// through reversal, and always stays within `0..=original_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub unit_price: Decimal,
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub attachment_ref: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Quantity already consumed from this lot, net of reversals
    pub fn issued_quantity(&self) -> Decimal {
        self.original_quantity - self.remaining_quantity
    }

    /// Whether any quantity has ever been consumed and not reversed
    pub fn is_untouched(&self) -> bool {
        self.remaining_quantity == self.original_quantity
    }
}

/// A lot still holding stock, as shown in the origin stock view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenLot {
    pub lot_id: Uuid,
    pub purchase_date: NaiveDate,
    pub remaining_quantity: Decimal,
    pub unit_price: Decimal,
}

/// Origin-side stock position for one item: open lots in consumption
/// order plus the total still on hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStock {
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub total_remaining: Decimal,
    pub open_lots: Vec<OpenLot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_quantity() {
        let lot = Lot {
            id: Uuid::from_u128(1),
            item_id: Uuid::from_u128(2),
            item_name: "Gin".into(),
            original_quantity: "24".parse().unwrap(),
            remaining_quantity: "10".parse().unwrap(),
            unit_price: "450".parse().unwrap(),
            purchase_date: "2024-01-01".parse().unwrap(),
            supplier: None,
            invoice_number: None,
            attachment_ref: None,
            created_by: Uuid::from_u128(3),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(lot.issued_quantity(), "14".parse::<Decimal>().unwrap());
        assert!(!lot.is_untouched());
    }
}
