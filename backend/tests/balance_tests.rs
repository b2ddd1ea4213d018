//! Balance reconciliation tests
//!
//! Checks the movement-total arithmetic behind the balance report: the
//! origin and destination formulas, voided-sale exclusion, and the
//! reconciliation identity against a simulated movement history.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::MovementTotals;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Origin balance: purchases in, every consumption path out
    #[test]
    fn test_origin_formula() {
        let totals = MovementTotals {
            received: dec("150"),
            issued: dec("120"),
            sold: Decimal::ZERO,
            adjusted: dec("5"),
        };
        assert_eq!(totals.origin_balance(), dec("25"));
    }

    /// Destination balance never includes purchases
    #[test]
    fn test_destination_formula() {
        let totals = MovementTotals {
            received: Decimal::ZERO,
            issued: dec("120"),
            sold: dec("90"),
            adjusted: dec("10"),
        };
        assert_eq!(totals.destination_balance(), dec("20"));
    }

    /// The scenario's destination view after the sale is reversed:
    /// issued 110, nothing sold, balance 110
    #[test]
    fn test_destination_after_sale_reversal() {
        let totals = MovementTotals {
            received: Decimal::ZERO,
            issued: dec("110"),
            sold: Decimal::ZERO,
            adjusted: Decimal::ZERO,
        };
        assert_eq!(totals.balance_for_scope(true), dec("110"));
    }

    /// Voided sales drop out of `sold`; the balance reflects the
    /// remaining live sales only
    #[test]
    fn test_voided_sales_excluded_from_sold() {
        let sales: [(Decimal, bool); 3] = [
            (dec("40"), false),
            (dec("90"), true), // voided
            (dec("10"), false),
        ];
        let sold: Decimal = sales
            .iter()
            .filter(|(_, voided)| !voided)
            .map(|(quantity, _)| *quantity)
            .sum();
        let totals = MovementTotals {
            received: Decimal::ZERO,
            issued: dec("120"),
            sold,
            adjusted: Decimal::ZERO,
        };
        assert_eq!(totals.destination_balance(), dec("70"));
    }

    /// Valued balance is balance times the latest unit price
    #[test]
    fn test_balance_valuation() {
        let totals = MovementTotals {
            received: dec("150"),
            issued: dec("120"),
            sold: Decimal::ZERO,
            adjusted: Decimal::ZERO,
        };
        let unit_value = dec("12");
        assert_eq!(totals.origin_balance() * unit_value, dec("360"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The reconciliation identity holds exactly for any totals
        #[test]
        fn prop_reconciliation_identity(
            received in quantity_strategy(),
            issued in quantity_strategy(),
            sold in quantity_strategy(),
            adjusted in quantity_strategy()
        ) {
            let totals = MovementTotals { received, issued, sold, adjusted };
            prop_assert_eq!(
                totals.origin_balance(),
                received - issued - sold - adjusted
            );
            prop_assert_eq!(totals.destination_balance(), issued - sold - adjusted);
        }

        /// A destination history that only sells and adjusts what was
        /// issued to it never reconciles negative
        #[test]
        fn prop_consistent_history_never_negative(
            issues in prop::collection::vec(quantity_strategy(), 1..10),
            consumption_fraction in 0u32..=100u32
        ) {
            let issued: Decimal = issues.iter().sum();
            let consumed = issued * Decimal::from(consumption_fraction) / Decimal::from(100u32);
            // Split consumption between sales and adjustments
            let sold = consumed / Decimal::from(2u32);
            let adjusted = consumed - sold;

            let totals = MovementTotals {
                received: Decimal::ZERO,
                issued,
                sold,
                adjusted,
            };
            prop_assert!(totals.destination_balance() >= Decimal::ZERO);
        }

        /// Origin and destination scopes agree on conservation: what the
        /// origin issued equals what destinations received
        #[test]
        fn prop_issued_moves_between_scopes(
            received in quantity_strategy(),
            issued_fraction in 0u32..=100u32
        ) {
            let issued = received * Decimal::from(issued_fraction) / Decimal::from(100u32);
            let origin = MovementTotals {
                received,
                issued,
                sold: Decimal::ZERO,
                adjusted: Decimal::ZERO,
            };
            let destination = MovementTotals {
                received: Decimal::ZERO,
                issued,
                sold: Decimal::ZERO,
                adjusted: Decimal::ZERO,
            };
            prop_assert_eq!(
                origin.origin_balance() + destination.destination_balance(),
                received
            );
        }
    }
}
