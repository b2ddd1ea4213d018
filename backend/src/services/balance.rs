//! Balance reconciliation service (read-only)
//!
//! Computes movement totals and the valued balance for an item, optionally
//! scoped to a destination and a purchase/issue/sale date range. Reads
//! only; never mutates lots or counters.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{MovementTotals, StockBalance};
use shared::validation::validate_date_range;

use crate::error::{AppError, AppResult};

/// Service for stock balance reports
#[derive(Clone)]
pub struct BalanceService {
    db: PgPool,
}

/// Query scope for a balance report
#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub destination_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl BalanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Reconcile an item's balance.
    ///
    /// Origin scope: `received - issued - sold - adjusted` over purchases,
    /// all issuances, and origin-side adjustments. Destination scope:
    /// `issued - sold - adjusted` over that destination's movements only.
    /// A negative result means the ledger and its counters disagree and is
    /// surfaced, never floored.
    pub async fn balance(&self, item_id: Uuid, query: BalanceQuery) -> AppResult<StockBalance> {
        if let (Some(start), Some(end)) = (query.start, query.end) {
            validate_date_range(start, end).map_err(|msg| AppError::Validation {
                field: "date_range".to_string(),
                message: msg.to_string(),
            })?;
        }

        let item_name = sqlx::query_scalar::<_, String>("SELECT name FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        let destination_name = match query.destination_id {
            Some(destination_id) => Some(
                sqlx::query_scalar::<_, String>("SELECT name FROM destinations WHERE id = $1")
                    .bind(destination_id)
                    .fetch_optional(&self.db)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Destination".to_string()))?,
            ),
            None => None,
        };

        let destination_scoped = query.destination_id.is_some();

        // Purchases enter the range by purchase date and only count at the
        // origin; a destination never receives directly from a purchase.
        let received = if destination_scoped {
            Decimal::ZERO
        } else {
            sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(original_quantity), 0)
                FROM lots
                WHERE item_id = $1
                  AND ($2::DATE IS NULL OR purchase_date >= $2)
                  AND ($3::DATE IS NULL OR purchase_date <= $3)
                "#,
            )
            .bind(item_id)
            .bind(query.start)
            .bind(query.end)
            .fetch_one(&self.db)
            .await?
        };

        let issued = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(il.quantity), 0)
            FROM issuance_lines il
            JOIN issuances iss ON iss.id = il.issuance_id
            WHERE il.item_id = $1
              AND ($2::UUID IS NULL OR iss.destination_id = $2)
              AND ($3::DATE IS NULL OR iss.issue_date >= $3)
              AND ($4::DATE IS NULL OR iss.issue_date <= $4)
            "#,
        )
        .bind(item_id)
        .bind(query.destination_id)
        .bind(query.start)
        .bind(query.end)
        .fetch_one(&self.db)
        .await?;

        // Sales are destination-local, so an origin-scoped report has no
        // sold movement of its own; those units already left as issuances.
        let sold = if destination_scoped {
            sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(sl.quantity), 0)
                FROM sale_lines sl
                JOIN sales s ON s.id = sl.sale_id
                WHERE sl.item_id = $1
                  AND s.destination_id = $2
                  AND s.voided_at IS NULL
                  AND ($3::DATE IS NULL OR s.sale_date >= $3)
                  AND ($4::DATE IS NULL OR s.sale_date <= $4)
                "#,
            )
            .bind(item_id)
            .bind(query.destination_id)
            .bind(query.start)
            .bind(query.end)
            .fetch_one(&self.db)
            .await?
        } else {
            Decimal::ZERO
        };

        // Origin scope counts origin-side adjustments (null destination);
        // destination scope counts that destination's adjustments.
        let adjusted = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM adjustments
            WHERE item_id = $1
              AND (($2::UUID IS NULL AND destination_id IS NULL) OR destination_id = $2)
              AND ($3::DATE IS NULL OR created_at::DATE >= $3)
              AND ($4::DATE IS NULL OR created_at::DATE <= $4)
            "#,
        )
        .bind(item_id)
        .bind(query.destination_id)
        .bind(query.start)
        .bind(query.end)
        .fetch_one(&self.db)
        .await?;

        // Valuation always uses the newest purchase price, independent of
        // the query range, falling back to the item's reference price for
        // items that have never been purchased.
        let unit_value = sqlx::query_scalar::<_, Decimal>(
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
        .fetch_one(&self.db)
        .await?;

        let totals = MovementTotals {
            received,
            issued,
            sold,
            adjusted,
        };
        let balance = totals.balance_for_scope(destination_scoped);

        if balance < Decimal::ZERO {
            tracing::error!(
                "Negative reconciled balance {} for item {} (destination {:?})",
                balance,
                item_id,
                query.destination_id
            );
            return Err(AppError::InvariantViolation(format!(
                "Reconciled balance for item {} is negative ({})",
                item_id, balance
            )));
        }

        Ok(StockBalance {
            item_id,
            item_name,
            destination_id: query.destination_id,
            destination_name,
            start: query.start,
            end: query.end,
            totals,
            balance,
            unit_value,
            balance_value: balance * unit_value,
        })
    }
}
