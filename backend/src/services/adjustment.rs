//! Adjustment service: manual stock corrections with reversal support
//!
//! Origin-side adjustments (no destination) draw from the newest lot with
//! stock; destination-side adjustments debit the destination counter and
//! never touch origin lots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::Adjustment;
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_adjustment_reason, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::services::stock;

/// Service for manual stock corrections
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
}

/// Input for creating or replacing an adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub item_id: Uuid,
    pub destination_id: Option<Uuid>,
    pub quantity: Decimal,
    pub reason: String,
}

type AdjustmentRow = (
    Uuid,
    Uuid,
    String,
    Option<Uuid>,
    Option<String>,
    Decimal,
    String,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

const ADJUSTMENT_SELECT: &str = r#"
    SELECT a.id, a.item_id, i.name AS item_name, a.destination_id, d.name AS destination_name,
           a.quantity, a.reason, a.created_by, a.created_at, a.updated_at
    FROM adjustments a
    JOIN items i ON i.id = a.item_id
    LEFT JOIN destinations d ON d.id = a.destination_id
"#;

fn adjustment_from_row(row: AdjustmentRow) -> Adjustment {
    let (
        id,
        item_id,
        item_name,
        destination_id,
        destination_name,
        quantity,
        reason,
        created_by,
        created_at,
        updated_at,
    ) = row;
    Adjustment {
        id,
        item_id,
        item_name,
        destination_id,
        destination_name,
        quantity,
        reason,
        created_by,
        created_at,
        updated_at,
    }
}

fn validate_input(input: &AdjustmentInput) -> AppResult<()> {
    validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
        field: "quantity".to_string(),
        message: msg.to_string(),
    })?;
    validate_adjustment_reason(&input.reason).map_err(|msg| AppError::Validation {
        field: "reason".to_string(),
        message: msg.to_string(),
    })?;
    Ok(())
}

impl AdjustmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a stock correction
    pub async fn create_adjustment(
        &self,
        user_id: Uuid,
        input: AdjustmentInput,
    ) -> AppResult<Adjustment> {
        validate_input(&input)?;

        let mut tx = self.db.begin().await?;

        ensure_targets(&mut tx, &input).await?;

        let adjustment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO adjustments (item_id, destination_id, quantity, reason, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.item_id)
        .bind(input.destination_id)
        .bind(input.quantity)
        .bind(input.reason.trim())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        apply_adjustment(&mut tx, adjustment_id, &input).await?;

        tx.commit().await?;

        tracing::info!(
            "Adjusted item {} by {} ({})",
            input.item_id,
            input.quantity,
            if input.destination_id.is_some() {
                "destination"
            } else {
                "origin"
            }
        );

        self.get_adjustment(adjustment_id).await
    }

    /// List adjustments, newest first
    pub async fn list_adjustments(
        &self,
        pagination: Pagination,
        item_id: Option<Uuid>,
        destination_id: Option<Uuid>,
    ) -> AppResult<PaginatedResponse<Adjustment>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM adjustments
            WHERE ($1::UUID IS NULL OR item_id = $1)
              AND ($2::UUID IS NULL OR destination_id = $2)
            "#,
        )
        .bind(item_id)
        .bind(destination_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, AdjustmentRow>(&format!(
            r#"
            {}
            WHERE ($1::UUID IS NULL OR a.item_id = $1)
              AND ($2::UUID IS NULL OR a.destination_id = $2)
            ORDER BY a.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            ADJUSTMENT_SELECT
        ))
        .bind(item_id)
        .bind(destination_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(adjustment_from_row).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Get an adjustment by ID
    pub async fn get_adjustment(&self, adjustment_id: Uuid) -> AppResult<Adjustment> {
        let row = sqlx::query_as::<_, AdjustmentRow>(&format!(
            "{} WHERE a.id = $1",
            ADJUSTMENT_SELECT
        ))
        .bind(adjustment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        Ok(adjustment_from_row(row))
    }

    /// Replace an adjustment: credit the old quantity back to its original
    /// target, then validate and apply the new values. The item and the
    /// destination may both change between old and new.
    pub async fn update_adjustment(
        &self,
        adjustment_id: Uuid,
        input: AdjustmentInput,
    ) -> AppResult<Adjustment> {
        validate_input(&input)?;

        let mut tx = self.db.begin().await?;

        let old = sqlx::query_as::<_, (Uuid, Option<Uuid>, Decimal)>(
            "SELECT item_id, destination_id, quantity FROM adjustments WHERE id = $1 FOR UPDATE",
        )
        .bind(adjustment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        ensure_targets(&mut tx, &input).await?;

        reverse_adjustment(&mut tx, adjustment_id, old.1, old.0).await?;

        sqlx::query(
            r#"
            UPDATE adjustments
            SET item_id = $1, destination_id = $2, quantity = $3, reason = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(input.item_id)
        .bind(input.destination_id)
        .bind(input.quantity)
        .bind(input.reason.trim())
        .bind(adjustment_id)
        .execute(&mut *tx)
        .await?;

        apply_adjustment(&mut tx, adjustment_id, &input).await?;

        tx.commit().await?;

        self.get_adjustment(adjustment_id).await
    }

    /// Delete an adjustment: credit the quantity back, remove the entry
    pub async fn delete_adjustment(&self, adjustment_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let old = sqlx::query_as::<_, (Uuid, Option<Uuid>, Decimal)>(
            "SELECT item_id, destination_id, quantity FROM adjustments WHERE id = $1 FOR UPDATE",
        )
        .bind(adjustment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

        reverse_adjustment(&mut tx, adjustment_id, old.1, old.0).await?;

        sqlx::query("DELETE FROM adjustments WHERE id = $1")
            .bind(adjustment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn ensure_targets(
    tx: &mut Transaction<'_, Postgres>,
    input: &AdjustmentInput,
) -> AppResult<()> {
    let item_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE id = $1")
        .bind(input.item_id)
        .fetch_one(&mut **tx)
        .await?;
    if item_exists == 0 {
        return Err(AppError::NotFound("Item".to_string()));
    }

    if let Some(destination_id) = input.destination_id {
        let destination_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations WHERE id = $1")
                .bind(destination_id)
                .fetch_one(&mut **tx)
                .await?;
        if destination_exists == 0 {
            return Err(AppError::NotFound("Destination".to_string()));
        }
    }
    Ok(())
}

/// Take the adjusted quantity out of its target
async fn apply_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
    input: &AdjustmentInput,
) -> AppResult<()> {
    match input.destination_id {
        Some(destination_id) => {
            stock::debit_destination(tx, destination_id, input.item_id, input.quantity).await?;
        }
        None => {
            let draw = stock::consume_newest(tx, input.item_id, input.quantity).await?;
            stock::persist_consumptions(
                tx,
                stock::ConsumptionOwner::Adjustment(adjustment_id),
                std::slice::from_ref(&draw),
            )
            .await?;
        }
    }
    Ok(())
}

/// Credit a previously applied adjustment back to its original target
async fn reverse_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
    destination_id: Option<Uuid>,
    item_id: Uuid,
) -> AppResult<()> {
    match destination_id {
        Some(destination_id) => {
            let quantity = sqlx::query_scalar::<_, Decimal>(
                "SELECT quantity FROM adjustments WHERE id = $1",
            )
            .bind(adjustment_id)
            .fetch_one(&mut **tx)
            .await?;
            stock::restore_destination(tx, destination_id, item_id, quantity).await?;
        }
        None => {
            let draws = stock::consumptions_for_adjustment(tx, adjustment_id).await?;
            stock::restore(tx, &draws).await?;
            sqlx::query("DELETE FROM lot_consumptions WHERE adjustment_id = $1")
                .bind(adjustment_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}
