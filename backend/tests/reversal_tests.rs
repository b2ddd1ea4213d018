//! Reversal coordinator tests
//!
//! Simulates the ledger's issue / sell / adjust / reverse flows over an
//! in-memory lot book using the same pure arithmetic the backend applies
//! inside its transactions, and checks that edits and deletes restore
//! stock exactly.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use shared::allocation::{
    allocate, checked_restore, draw_single, sort_candidates, AllocationError, CandidateLot,
    ConsumptionEvent, LotOrdering,
};
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// One lot as the ledger stores it
#[derive(Debug, Clone)]
struct BookLot {
    id: Uuid,
    purchase_date: NaiveDate,
    original: Decimal,
    remaining: Decimal,
}

/// In-memory stand-in for the lot table plus destination counters
#[derive(Debug, Default)]
struct LotBook {
    lots: Vec<BookLot>,
    destinations: HashMap<Uuid, Decimal>,
}

impl LotBook {
    fn add_lot(&mut self, id: u128, purchased: &str, quantity: &str) -> Uuid {
        let id = Uuid::from_u128(id);
        self.lots.push(BookLot {
            id,
            purchase_date: date(purchased),
            original: dec(quantity),
            remaining: dec(quantity),
        });
        id
    }

    fn remaining(&self, lot_id: Uuid) -> Decimal {
        self.lots.iter().find(|l| l.id == lot_id).unwrap().remaining
    }

    fn total_remaining(&self) -> Decimal {
        self.lots.iter().map(|l| l.remaining).sum()
    }

    fn total_original(&self) -> Decimal {
        self.lots.iter().map(|l| l.original).sum()
    }

    fn destination(&self, id: Uuid) -> Decimal {
        self.destinations.get(&id).copied().unwrap_or(Decimal::ZERO)
    }

    fn candidates(&self, ordering: LotOrdering) -> Vec<CandidateLot> {
        let mut candidates: Vec<CandidateLot> = self
            .lots
            .iter()
            .filter(|l| l.remaining > Decimal::ZERO)
            .map(|l| CandidateLot {
                lot_id: l.id,
                purchase_date: l.purchase_date,
                remaining_quantity: l.remaining,
            })
            .collect();
        sort_candidates(&mut candidates, ordering);
        candidates
    }

    /// FIFO-consume and credit the destination, as an issuance line does
    fn issue(
        &mut self,
        destination: Uuid,
        quantity: Decimal,
    ) -> Result<ConsumptionEvent, AllocationError> {
        let draws = allocate(&self.candidates(LotOrdering::OldestFirst), quantity)?;
        for draw in &draws {
            let l = self.lots.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
            l.remaining -= draw.quantity;
        }
        *self.destinations.entry(destination).or_default() += quantity;
        Ok(draws)
    }

    /// Reverse an issuance: restore the breakdown, debit the destination
    fn reverse_issue(
        &mut self,
        destination: Uuid,
        quantity: Decimal,
        draws: &ConsumptionEvent,
    ) -> Result<(), AllocationError> {
        for draw in draws {
            let l = self.lots.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
            l.remaining = checked_restore(l.id, l.remaining, l.original, draw.quantity)?;
        }
        *self.destinations.get_mut(&destination).unwrap() -= quantity;
        Ok(())
    }

    /// Destination-local sale: counter only, origin lots untouched
    fn sell(&mut self, destination: Uuid, quantity: Decimal) -> Result<(), Decimal> {
        let held = self.destination(destination);
        if held < quantity {
            return Err(quantity - held);
        }
        *self.destinations.get_mut(&destination).unwrap() -= quantity;
        Ok(())
    }

    fn reverse_sale(&mut self, destination: Uuid, quantity: Decimal) {
        *self.destinations.entry(destination).or_default() += quantity;
    }

    /// Origin-side adjustment: draw from the newest lot with stock
    fn adjust_origin(&mut self, quantity: Decimal) -> Result<ConsumptionEvent, AllocationError> {
        let candidates = self.candidates(LotOrdering::NewestFirst);
        let newest = candidates.first().ok_or(AllocationError::Shortfall {
            requested: quantity,
            available: Decimal::ZERO,
        })?;
        let draw = draw_single(newest, quantity)?;
        let l = self.lots.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
        l.remaining -= draw.quantity;
        Ok(vec![draw])
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Spec scenario: two lots, issue 120 to a kitchen, sell 90 there,
    /// delete the sale, then edit the issuance down to 110
    #[test]
    fn test_issue_sell_reverse_edit_scenario() {
        let mut book = LotBook::default();
        let lot_a = book.add_lot(1, "2024-01-01", "100");
        let lot_b = book.add_lot(2, "2024-01-05", "50");
        let kitchen = Uuid::from_u128(100);

        // Issue 120: all of A, 20 of B
        let draws = book.issue(kitchen, dec("120")).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].lot_id, lot_a);
        assert_eq!(draws[0].quantity, dec("100"));
        assert_eq!(draws[1].lot_id, lot_b);
        assert_eq!(draws[1].quantity, dec("20"));
        assert_eq!(book.remaining(lot_a), dec("0"));
        assert_eq!(book.remaining(lot_b), dec("30"));
        assert_eq!(book.destination(kitchen), dec("120"));

        // Kitchen sells 90, then the sale is deleted
        book.sell(kitchen, dec("90")).unwrap();
        assert_eq!(book.destination(kitchen), dec("30"));
        book.reverse_sale(kitchen, dec("90"));
        assert_eq!(book.destination(kitchen), dec("120"));

        // Edit the issuance down to 110: reverse in full, re-apply
        book.reverse_issue(kitchen, dec("120"), &draws).unwrap();
        assert_eq!(book.remaining(lot_a), dec("100"));
        assert_eq!(book.remaining(lot_b), dec("50"));
        let draws = book.issue(kitchen, dec("110")).unwrap();

        assert_eq!(book.remaining(lot_a), dec("0"));
        assert_eq!(book.remaining(lot_b), dec("40"));
        assert_eq!(book.destination(kitchen), dec("110"));
        let consumed: Decimal = draws.iter().map(|d| d.quantity).sum();
        assert_eq!(consumed, dec("110"));
    }

    /// Editing an issuance of 10 down to 4 leaves exactly 4 consumed,
    /// regardless of how many lots the original walk touched
    #[test]
    fn test_edit_never_leaks_or_double_counts() {
        let mut book = LotBook::default();
        book.add_lot(1, "2024-01-01", "3");
        book.add_lot(2, "2024-01-02", "3");
        book.add_lot(3, "2024-01-03", "6");
        let bar = Uuid::from_u128(200);

        let draws = book.issue(bar, dec("10")).unwrap();
        assert_eq!(book.total_remaining(), dec("2"));

        book.reverse_issue(bar, dec("10"), &draws).unwrap();
        book.issue(bar, dec("4")).unwrap();

        assert_eq!(book.total_original() - book.total_remaining(), dec("4"));
        assert_eq!(book.destination(bar), dec("4"));
    }

    /// A failed issuance leaves every lot untouched
    #[test]
    fn test_failed_issue_mutates_nothing() {
        let mut book = LotBook::default();
        book.add_lot(1, "2024-01-01", "25");
        book.add_lot(2, "2024-01-02", "15");
        let bar = Uuid::from_u128(200);

        let err = book.issue(bar, dec("100")).unwrap_err();
        assert_eq!(err.shortfall_amount(), dec("60"));
        assert_eq!(book.total_remaining(), dec("40"));
        assert_eq!(book.destination(bar), dec("0"));
    }

    /// Two destinations draw from the same FIFO pool but keep
    /// independent counters
    #[test]
    fn test_destination_isolation() {
        let mut book = LotBook::default();
        let lot = book.add_lot(1, "2024-01-01", "40");
        let bar_a = Uuid::from_u128(201);
        let bar_b = Uuid::from_u128(202);

        book.issue(bar_a, dec("20")).unwrap();
        book.issue(bar_b, dec("5")).unwrap();

        assert_eq!(book.destination(bar_a), dec("20"));
        assert_eq!(book.destination(bar_b), dec("5"));
        assert_eq!(book.remaining(lot), dec("15"));
    }

    /// Origin adjustments hit the newest lot, and reversing one restores
    /// that same lot
    #[test]
    fn test_adjustment_targets_newest_lot() {
        let mut book = LotBook::default();
        let older = book.add_lot(1, "2024-01-01", "50");
        let newer = book.add_lot(2, "2024-03-01", "10");

        let draws = book.adjust_origin(dec("6")).unwrap();
        assert_eq!(draws[0].lot_id, newer);
        assert_eq!(book.remaining(newer), dec("4"));
        assert_eq!(book.remaining(older), dec("50"));

        // Reverse the adjustment
        for draw in &draws {
            let l = book.lots.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
            l.remaining = checked_restore(l.id, l.remaining, l.original, draw.quantity).unwrap();
        }
        assert_eq!(book.remaining(newer), dec("10"));
    }

    /// Replaying a recorded breakdown after stock has already been
    /// restored is caught by the cap, not silently absorbed
    #[test]
    fn test_double_reversal_detected() {
        let mut book = LotBook::default();
        book.add_lot(1, "2024-01-01", "10");
        let bar = Uuid::from_u128(200);

        let draws = book.issue(bar, dec("10")).unwrap();
        book.reverse_issue(bar, dec("10"), &draws).unwrap();

        let err = book.reverse_issue(bar, dec("10"), &draws).unwrap_err();
        assert!(matches!(err, AllocationError::RestoreOverflow { .. }));
    }

    /// Selling more than the destination holds fails with the shortfall
    #[test]
    fn test_destination_sale_shortfall() {
        let mut book = LotBook::default();
        book.add_lot(1, "2024-01-01", "30");
        let bar = Uuid::from_u128(200);
        book.issue(bar, dec("30")).unwrap();

        book.sell(bar, dec("25")).unwrap();
        let shortfall = book.sell(bar, dec("10")).unwrap_err();
        assert_eq!(shortfall, dec("5"));
        assert_eq!(book.destination(bar), dec("5"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=500_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    /// A random batch of lots followed by random issue / reverse pairs
    fn ops_strategy() -> impl Strategy<Value = (Vec<(u32, Decimal)>, Vec<Decimal>)> {
        (
            prop::collection::vec((0u32..200u32, quantity_strategy()), 1..8),
            prop::collection::vec(quantity_strategy(), 0..12),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(150))]

        /// Conservation: remaining + net consumed == original, at every
        /// step of an arbitrary issue history
        #[test]
        fn prop_conservation_under_issues((lot_specs, requests) in ops_strategy()) {
            let mut book = LotBook::default();
            for (i, (day, quantity)) in lot_specs.iter().enumerate() {
                let id = Uuid::from_u128(i as u128 + 1);
                book.lots.push(BookLot {
                    id,
                    purchase_date: date("2024-01-01") + chrono::Duration::days(*day as i64),
                    original: *quantity,
                    remaining: *quantity,
                });
            }
            let destination = Uuid::from_u128(999);
            let mut consumed = Decimal::ZERO;

            for request in requests {
                if let Ok(draws) = book.issue(destination, request) {
                    consumed += draws.iter().map(|d| d.quantity).sum::<Decimal>();
                }
                prop_assert_eq!(
                    book.total_remaining() + consumed,
                    book.total_original()
                );
                prop_assert_eq!(book.destination(destination), consumed);
            }
        }

        /// Issue-then-reverse returns every lot and counter to its exact
        /// starting state
        #[test]
        fn prop_full_reversal_is_identity((lot_specs, requests) in ops_strategy()) {
            let mut book = LotBook::default();
            for (i, (day, quantity)) in lot_specs.iter().enumerate() {
                let id = Uuid::from_u128(i as u128 + 1);
                book.lots.push(BookLot {
                    id,
                    purchase_date: date("2024-01-01") + chrono::Duration::days(*day as i64),
                    original: *quantity,
                    remaining: *quantity,
                });
            }
            let destination = Uuid::from_u128(999);
            let before: Vec<Decimal> = book.lots.iter().map(|l| l.remaining).collect();

            let mut history = Vec::new();
            for request in requests {
                if let Ok(draws) = book.issue(destination, request) {
                    history.push((request, draws));
                }
            }
            // Reverse in any order; restores are per-lot exact
            for (request, draws) in history.into_iter().rev() {
                book.reverse_issue(destination, request, &draws).unwrap();
            }

            let after: Vec<Decimal> = book.lots.iter().map(|l| l.remaining).collect();
            prop_assert_eq!(after, before);
            prop_assert_eq!(book.destination(destination), Decimal::ZERO);
        }
    }
}
