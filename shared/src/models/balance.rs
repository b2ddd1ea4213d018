//! Stock balance reconciliation models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movement totals for one item over a reporting scope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub received: Decimal,
    pub issued: Decimal,
    pub sold: Decimal,
    pub adjusted: Decimal,
}

impl MovementTotals {
    /// Net balance at the origin store: purchases in, every consumption
    /// path out
    pub fn origin_balance(&self) -> Decimal {
        self.received - self.issued - self.sold - self.adjusted
    }

    /// Net balance at a destination, which never receives purchases
    /// directly: issues in, sales and adjustments out
    pub fn destination_balance(&self) -> Decimal {
        self.issued - self.sold - self.adjusted
    }

    /// Balance for the scope the totals were gathered under
    pub fn balance_for_scope(&self, destination_scoped: bool) -> Decimal {
        if destination_scoped {
            self.destination_balance()
        } else {
            self.origin_balance()
        }
    }
}

/// Valued reconciliation report for one item
///
/// `unit_value` is the newest lot's purchase price regardless of the query
/// range, so stock is always valued at current replacement cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub item_id: Uuid,
    pub item_name: String,
    pub destination_id: Option<Uuid>,
    pub destination_name: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(flatten)]
    pub totals: MovementTotals,
    pub balance: Decimal,
    pub unit_value: Decimal,
    pub balance_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_origin_balance() {
        let totals = MovementTotals {
            received: dec("150"),
            issued: dec("120"),
            sold: Decimal::ZERO,
            adjusted: dec("5"),
        };
        assert_eq!(totals.origin_balance(), dec("25"));
        assert_eq!(totals.balance_for_scope(false), dec("25"));
    }

    #[test]
    fn test_destination_balance_ignores_received() {
        let totals = MovementTotals {
            received: Decimal::ZERO,
            issued: dec("120"),
            sold: dec("90"),
            adjusted: dec("10"),
        };
        assert_eq!(totals.destination_balance(), dec("20"));
        assert_eq!(totals.balance_for_scope(true), dec("20"));
    }
}
