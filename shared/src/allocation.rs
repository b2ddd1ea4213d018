//! Lot selection and allocation arithmetic for the stock ledger
//!
//! Pure functions deciding how a requested quantity is drawn from (or
//! restored to) purchase lots. The ordering strategy is explicit so that
//! issuance consumption (oldest purchases first) and origin-side
//! adjustments (newest purchase first) share one selection primitive
//! instead of two diverging copies.
//!
//! Nothing here touches storage; the backend applies the returned draws
//! inside its own transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordering strategy for candidate lot selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotOrdering {
    /// Drain the oldest purchase first (issuance, sales consumption)
    OldestFirst,
    /// Target the most recent purchase first (origin-side adjustments)
    NewestFirst,
}

/// A candidate lot as the allocator sees it
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLot {
    pub lot_id: Uuid,
    pub purchase_date: NaiveDate,
    pub remaining_quantity: Decimal,
}

/// One slice of an allocation: how much is taken from which lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: Uuid,
    pub quantity: Decimal,
}

/// The ordered per-lot breakdown produced by a successful allocation
pub type ConsumptionEvent = Vec<LotDraw>;

/// Failures of the allocation and restore arithmetic
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("requested quantity must be positive")]
    NonPositiveQuantity,

    #[error("requested {requested} but only {available} available")]
    Shortfall {
        requested: Decimal,
        available: Decimal,
    },

    #[error(
        "restoring {restore} to lot {lot_id} would exceed its original quantity \
         ({remaining} remaining of {original})"
    )]
    RestoreOverflow {
        lot_id: Uuid,
        remaining: Decimal,
        original: Decimal,
        restore: Decimal,
    },
}

impl AllocationError {
    /// Missing quantity for shortfall errors, zero otherwise
    pub fn shortfall_amount(&self) -> Decimal {
        match self {
            AllocationError::Shortfall {
                requested,
                available,
            } => *requested - *available,
            _ => Decimal::ZERO,
        }
    }
}

/// Sort candidates into walk order. Ties on purchase date break on lot id
/// so the order is stable and reproducible across runs.
pub fn sort_candidates(lots: &mut [CandidateLot], ordering: LotOrdering) {
    match ordering {
        LotOrdering::OldestFirst => {
            lots.sort_by(|a, b| (a.purchase_date, a.lot_id).cmp(&(b.purchase_date, b.lot_id)))
        }
        LotOrdering::NewestFirst => {
            lots.sort_by(|a, b| (b.purchase_date, b.lot_id).cmp(&(a.purchase_date, a.lot_id)))
        }
    }
}

/// Walk pre-ordered candidates, drawing `min(remaining, still_needed)` from
/// each lot until the request is filled.
///
/// Total availability is checked before anything is drawn: a shortfall
/// fails the whole allocation and produces no draws, so callers can never
/// observe a partially applied request.
pub fn allocate(
    lots: &[CandidateLot],
    requested: Decimal,
) -> Result<ConsumptionEvent, AllocationError> {
    if requested <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity);
    }

    let available: Decimal = lots.iter().map(|l| l.remaining_quantity).sum();
    if available < requested {
        return Err(AllocationError::Shortfall {
            requested,
            available,
        });
    }

    let mut still_needed = requested;
    let mut draws = Vec::new();
    for lot in lots {
        if still_needed <= Decimal::ZERO {
            break;
        }
        if lot.remaining_quantity <= Decimal::ZERO {
            continue;
        }
        let take = lot.remaining_quantity.min(still_needed);
        draws.push(LotDraw {
            lot_id: lot.lot_id,
            quantity: take,
        });
        still_needed -= take;
    }

    Ok(draws)
}

/// Draw a quantity from a single lot, failing if the lot cannot cover it.
/// Origin-side adjustments use this against the newest lot with stock.
pub fn draw_single(lot: &CandidateLot, requested: Decimal) -> Result<LotDraw, AllocationError> {
    if requested <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity);
    }
    if lot.remaining_quantity < requested {
        return Err(AllocationError::Shortfall {
            requested,
            available: lot.remaining_quantity,
        });
    }
    Ok(LotDraw {
        lot_id: lot.lot_id,
        quantity: requested,
    })
}

/// New remaining quantity after restoring `restore` units to a lot.
///
/// A restore that would push `remaining` above `original` signals a
/// double-reversal or corrupted breakdown; it is reported, never clamped.
pub fn checked_restore(
    lot_id: Uuid,
    remaining: Decimal,
    original: Decimal,
    restore: Decimal,
) -> Result<Decimal, AllocationError> {
    let restored = remaining + restore;
    if restored > original {
        return Err(AllocationError::RestoreOverflow {
            lot_id,
            remaining,
            original,
            restore,
        });
    }
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn lot(id: u128, purchased: &str, remaining: &str) -> CandidateLot {
        CandidateLot {
            lot_id: Uuid::from_u128(id),
            purchase_date: date(purchased),
            remaining_quantity: dec(remaining),
        }
    }

    #[test]
    fn test_allocate_drains_oldest_first() {
        let lots = vec![lot(1, "2024-01-01", "5"), lot(2, "2024-01-02", "5")];
        let draws = allocate(&lots, dec("7")).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].lot_id, Uuid::from_u128(1));
        assert_eq!(draws[0].quantity, dec("5"));
        assert_eq!(draws[1].lot_id, Uuid::from_u128(2));
        assert_eq!(draws[1].quantity, dec("2"));
    }

    #[test]
    fn test_allocate_single_lot_partial() {
        let lots = vec![lot(1, "2024-01-01", "100")];
        let draws = allocate(&lots, dec("40")).unwrap();
        assert_eq!(draws, vec![LotDraw {
            lot_id: Uuid::from_u128(1),
            quantity: dec("40"),
        }]);
    }

    #[test]
    fn test_allocate_exact_fit() {
        let lots = vec![lot(1, "2024-01-01", "3"), lot(2, "2024-01-02", "4")];
        let draws = allocate(&lots, dec("7")).unwrap();
        let total: Decimal = draws.iter().map(|d| d.quantity).sum();
        assert_eq!(total, dec("7"));
    }

    #[test]
    fn test_allocate_shortfall_produces_no_draws() {
        let lots = vec![lot(1, "2024-01-01", "30"), lot(2, "2024-01-02", "10")];
        let err = allocate(&lots, dec("100")).unwrap_err();
        assert_eq!(err, AllocationError::Shortfall {
            requested: dec("100"),
            available: dec("40"),
        });
        assert_eq!(err.shortfall_amount(), dec("60"));
    }

    #[test]
    fn test_allocate_rejects_non_positive() {
        let lots = vec![lot(1, "2024-01-01", "10")];
        assert_eq!(
            allocate(&lots, Decimal::ZERO).unwrap_err(),
            AllocationError::NonPositiveQuantity
        );
        assert_eq!(
            allocate(&lots, dec("-5")).unwrap_err(),
            AllocationError::NonPositiveQuantity
        );
    }

    #[test]
    fn test_allocate_skips_empty_lots() {
        let lots = vec![
            lot(1, "2024-01-01", "0"),
            lot(2, "2024-01-02", "5"),
            lot(3, "2024-01-03", "5"),
        ];
        let draws = allocate(&lots, dec("6")).unwrap();
        assert_eq!(draws[0].lot_id, Uuid::from_u128(2));
        assert_eq!(draws[1].lot_id, Uuid::from_u128(3));
        assert_eq!(draws[1].quantity, dec("1"));
    }

    #[test]
    fn test_sort_candidates_oldest_first_with_tie() {
        let mut lots = vec![
            lot(9, "2024-01-05", "1"),
            lot(2, "2024-01-01", "1"),
            lot(7, "2024-01-01", "1"),
        ];
        sort_candidates(&mut lots, LotOrdering::OldestFirst);
        let ids: Vec<Uuid> = lots.iter().map(|l| l.lot_id).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(2), Uuid::from_u128(7), Uuid::from_u128(9)]
        );
    }

    #[test]
    fn test_sort_candidates_newest_first() {
        let mut lots = vec![
            lot(2, "2024-01-01", "1"),
            lot(9, "2024-01-05", "1"),
            lot(7, "2024-01-03", "1"),
        ];
        sort_candidates(&mut lots, LotOrdering::NewestFirst);
        assert_eq!(lots[0].lot_id, Uuid::from_u128(9));
        assert_eq!(lots[2].lot_id, Uuid::from_u128(2));
    }

    #[test]
    fn test_draw_single_respects_lot_availability() {
        let newest = lot(4, "2024-02-10", "8");
        let draw = draw_single(&newest, dec("3")).unwrap();
        assert_eq!(draw.quantity, dec("3"));

        let err = draw_single(&newest, dec("9")).unwrap_err();
        assert_eq!(err.shortfall_amount(), dec("1"));
    }

    #[test]
    fn test_checked_restore_within_cap() {
        let id = Uuid::from_u128(1);
        assert_eq!(
            checked_restore(id, dec("2"), dec("10"), dec("8")).unwrap(),
            dec("10")
        );
        assert_eq!(
            checked_restore(id, dec("0"), dec("10"), dec("4")).unwrap(),
            dec("4")
        );
    }

    #[test]
    fn test_checked_restore_overflow_is_error() {
        let id = Uuid::from_u128(1);
        let err = checked_restore(id, dec("5"), dec("10"), dec("6")).unwrap_err();
        assert!(matches!(err, AllocationError::RestoreOverflow { .. }));
    }
}
