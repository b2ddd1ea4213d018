//! Stock consumption engine and reversal coordinator
//!
//! Every mutation of `lots.remaining_quantity` or a
//! `destination_inventory.quantity` counter funnels through the functions
//! in this module, inside a transaction owned by the calling service. The
//! selection/walk arithmetic itself lives in `shared::allocation`; this
//! module locks candidate rows, applies the resulting draws, and persists
//! the per-lot breakdown that later reversals replay.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use shared::allocation::{
    allocate, checked_restore, draw_single, sort_candidates, AllocationError, CandidateLot,
    ConsumptionEvent, LotDraw, LotOrdering,
};

use crate::error::{AppError, AppResult};

/// Which ledger row owns a persisted consumption breakdown
#[derive(Debug, Clone, Copy)]
pub enum ConsumptionOwner {
    IssuanceLine(Uuid),
    Adjustment(Uuid),
}

/// Translate allocation arithmetic failures into API errors
fn map_allocation_error(item_id: Uuid, err: AllocationError) -> AppError {
    match err {
        AllocationError::NonPositiveQuantity => AppError::Validation {
            field: "quantity".to_string(),
            message: "Quantity must be greater than zero".to_string(),
        },
        AllocationError::Shortfall {
            requested,
            available,
        } => AppError::InsufficientStock {
            message: format!(
                "Item {} has {} in stock but {} was requested",
                item_id, available, requested
            ),
            shortfall: requested - available,
        },
        AllocationError::RestoreOverflow { .. } => {
            tracing::error!("Restore overflow for item {}: {}", item_id, err);
            AppError::InvariantViolation(err.to_string())
        }
    }
}

/// Lock and fetch the lots still holding stock for an item, in walk order.
///
/// `FOR UPDATE` keeps two concurrent consumers from both passing the
/// availability check against the same stale totals.
pub async fn lock_candidate_lots(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    ordering: LotOrdering,
) -> AppResult<Vec<CandidateLot>> {
    let rows = sqlx::query_as::<_, (Uuid, chrono::NaiveDate, Decimal)>(
        r#"
        SELECT id, purchase_date, remaining_quantity
        FROM lots
        WHERE item_id = $1 AND remaining_quantity > 0
        FOR UPDATE
        "#,
    )
    .bind(item_id)
    .fetch_all(&mut **tx)
    .await?;

    let mut candidates: Vec<CandidateLot> = rows
        .into_iter()
        .map(|(lot_id, purchase_date, remaining_quantity)| CandidateLot {
            lot_id,
            purchase_date,
            remaining_quantity,
        })
        .collect();
    sort_candidates(&mut candidates, ordering);
    Ok(candidates)
}

/// FIFO-consume `quantity` from an item's lots.
///
/// Availability is checked across all candidates before any decrement; a
/// shortfall aborts with no rows touched. Returns the ordered per-lot
/// breakdown for the caller to persist.
pub async fn consume(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<ConsumptionEvent> {
    let candidates = lock_candidate_lots(tx, item_id, LotOrdering::OldestFirst).await?;
    let draws =
        allocate(&candidates, quantity).map_err(|e| map_allocation_error(item_id, e))?;
    apply_draws(tx, &draws).await?;
    Ok(draws)
}

/// Draw `quantity` from the newest lot still holding stock.
///
/// Origin-side adjustments target the most recent purchase rather than
/// walking FIFO; the whole quantity must fit in that single lot.
pub async fn consume_newest(
    tx: &mut Transaction<'_, Postgres>,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<LotDraw> {
    let candidates = lock_candidate_lots(tx, item_id, LotOrdering::NewestFirst).await?;
    let newest = candidates.first().ok_or_else(|| AppError::InsufficientStock {
        message: format!("Item {} has no stock to adjust", item_id),
        shortfall: quantity,
    })?;
    let draw = draw_single(newest, quantity).map_err(|e| map_allocation_error(item_id, e))?;
    apply_draws(tx, std::slice::from_ref(&draw)).await?;
    Ok(draw)
}

/// Decrement each drawn lot's remaining quantity
async fn apply_draws(tx: &mut Transaction<'_, Postgres>, draws: &[LotDraw]) -> AppResult<()> {
    for draw in draws {
        sqlx::query(
            r#"
            UPDATE lots
            SET remaining_quantity = remaining_quantity - $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(draw.quantity)
        .bind(draw.lot_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Restore a recorded consumption breakdown onto its lots.
///
/// Each restore is capped at the lot's original quantity; an overflow
/// means a double reversal or a corrupted breakdown and is surfaced as an
/// invariant violation, never clamped away.
pub async fn restore(tx: &mut Transaction<'_, Postgres>, draws: &[LotDraw]) -> AppResult<()> {
    for draw in draws {
        let (remaining, original) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT remaining_quantity, original_quantity FROM lots WHERE id = $1 FOR UPDATE",
        )
        .bind(draw.lot_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            tracing::error!(
                "Consumption breakdown references missing lot {}",
                draw.lot_id
            );
            AppError::InvariantViolation(format!(
                "Lot {} referenced by a consumption record no longer exists",
                draw.lot_id
            ))
        })?;

        let restored =
            checked_restore(draw.lot_id, remaining, original, draw.quantity).map_err(|e| {
                tracing::error!("Reversal overflow on lot {}: {}", draw.lot_id, e);
                AppError::InvariantViolation(e.to_string())
            })?;

        sqlx::query(
            "UPDATE lots SET remaining_quantity = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(restored)
        .bind(draw.lot_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Persist a consumption breakdown against its owning ledger row
pub async fn persist_consumptions(
    tx: &mut Transaction<'_, Postgres>,
    owner: ConsumptionOwner,
    draws: &[LotDraw],
) -> AppResult<()> {
    let (issuance_line_id, adjustment_id) = match owner {
        ConsumptionOwner::IssuanceLine(id) => (Some(id), None),
        ConsumptionOwner::Adjustment(id) => (None, Some(id)),
    };
    for (position, draw) in draws.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO lot_consumptions (issuance_line_id, adjustment_id, lot_id, quantity, position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(issuance_line_id)
        .bind(adjustment_id)
        .bind(draw.lot_id)
        .bind(draw.quantity)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Fetch the recorded breakdown for an issuance line, in walk order
pub async fn consumptions_for_line(
    tx: &mut Transaction<'_, Postgres>,
    issuance_line_id: Uuid,
) -> AppResult<Vec<LotDraw>> {
    fetch_consumptions(tx, "issuance_line_id", issuance_line_id).await
}

/// Fetch the recorded breakdown for an origin-side adjustment
pub async fn consumptions_for_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
) -> AppResult<Vec<LotDraw>> {
    fetch_consumptions(tx, "adjustment_id", adjustment_id).await
}

async fn fetch_consumptions(
    tx: &mut Transaction<'_, Postgres>,
    owner_column: &str,
    owner_id: Uuid,
) -> AppResult<Vec<LotDraw>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal)>(&format!(
        "SELECT lot_id, quantity FROM lot_consumptions WHERE {} = $1 ORDER BY position",
        owner_column
    ))
    .bind(owner_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(lot_id, quantity)| LotDraw { lot_id, quantity })
        .collect())
}

/// Credit a destination's running counter after an issuance line.
///
/// The first credit for a (destination, item) pair creates the counter
/// row and seeds its selling price from the newest lot's purchase price
/// (copy-forward pricing; the price is editable afterwards).
pub async fn credit_destination(
    tx: &mut Transaction<'_, Postgres>,
    destination_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE destination_inventory
        SET quantity = quantity + $1, updated_at = NOW()
        WHERE destination_id = $2 AND item_id = $3
        "#,
    )
    .bind(quantity)
    .bind(destination_id)
    .bind(item_id)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        let selling_price = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(
                (SELECT unit_price FROM lots
                 WHERE item_id = $1
                 ORDER BY purchase_date DESC, id DESC
                 LIMIT 1),
                (SELECT unit_price FROM items WHERE id = $1)
            )
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO destination_inventory (destination_id, item_id, quantity, selling_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(destination_id)
        .bind(item_id)
        .bind(quantity)
        .bind(selling_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Debit a destination's running counter (sale line or destination-side
/// adjustment). Fails if the destination holds less than requested.
pub async fn debit_destination(
    tx: &mut Transaction<'_, Postgres>,
    destination_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<()> {
    let held = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT quantity FROM destination_inventory
        WHERE destination_id = $1 AND item_id = $2
        FOR UPDATE
        "#,
    )
    .bind(destination_id)
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Destination inventory".to_string()))?;

    if held < quantity {
        return Err(AppError::InsufficientStock {
            message: format!(
                "Destination holds {} of item {} but {} was requested",
                held, item_id, quantity
            ),
            shortfall: quantity - held,
        });
    }

    sqlx::query(
        r#"
        UPDATE destination_inventory
        SET quantity = quantity - $1, updated_at = NOW()
        WHERE destination_id = $2 AND item_id = $3
        "#,
    )
    .bind(quantity)
    .bind(destination_id)
    .bind(item_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Restore previously debited quantity to a destination's counter.
///
/// The counter row must still exist; a missing row during reversal means
/// the ledger and its cache have drifted apart.
pub async fn restore_destination(
    tx: &mut Transaction<'_, Postgres>,
    destination_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE destination_inventory
        SET quantity = quantity + $1, updated_at = NOW()
        WHERE destination_id = $2 AND item_id = $3
        "#,
    )
    .bind(quantity)
    .bind(destination_id)
    .bind(item_id)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        tracing::error!(
            "Reversal targets missing counter row for destination {} item {}",
            destination_id,
            item_id
        );
        return Err(AppError::InvariantViolation(format!(
            "No inventory counter for destination {} and item {} during reversal",
            destination_id, item_id
        )));
    }
    Ok(())
}
