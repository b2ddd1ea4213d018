//! Purchase lot service: intake, guarded edits, and the origin stock view

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{ItemStock, Lot, OpenLot};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_price, validate_quantity};

use crate::error::{AppError, AppResult};

/// Service for managing purchase lots
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

/// Database row for a lot joined with its item name
#[derive(Debug, Clone, sqlx::FromRow)]
struct LotRow {
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

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Lot {
            id: row.id,
            item_id: row.item_id,
            item_name: row.item_name,
            original_quantity: row.original_quantity,
            remaining_quantity: row.remaining_quantity,
            unit_price: row.unit_price,
            purchase_date: row.purchase_date,
            supplier: row.supplier,
            invoice_number: row.invoice_number,
            attachment_ref: row.attachment_ref,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for recording a purchase lot
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub purchase_date: NaiveDate,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub attachment_ref: Option<String>,
}

/// Input for editing a lot; omitted fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateLotInput {
    pub item_id: Option<Uuid>,
    pub original_quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
    pub attachment_ref: Option<String>,
}

const LOT_SELECT: &str = r#"
    SELECT l.id, l.item_id, i.name AS item_name, l.original_quantity, l.remaining_quantity,
           l.unit_price, l.purchase_date, l.supplier, l.invoice_number, l.attachment_ref,
           l.created_by, l.created_at, l.updated_at
    FROM lots l
    JOIN items i ON i.id = l.item_id
"#;

impl LotService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a purchase: creates a lot with its full quantity remaining
    pub async fn create_lot(&self, user_id: Uuid, input: CreateLotInput) -> AppResult<Lot> {
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_price(input.unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;

        let item_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE id = $1")
                .bind(input.item_id)
                .fetch_one(&self.db)
                .await?;
        if item_exists == 0 {
            return Err(AppError::NotFound("Item".to_string()));
        }

        let lot_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO lots (item_id, original_quantity, remaining_quantity, unit_price,
                              purchase_date, supplier, invoice_number, attachment_ref, created_by)
            VALUES ($1, $2, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(input.item_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(input.purchase_date)
        .bind(&input.supplier)
        .bind(&input.invoice_number)
        .bind(&input.attachment_ref)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        self.get_lot(lot_id).await
    }

    /// List lots, newest purchases first
    pub async fn list_lots(
        &self,
        pagination: Pagination,
        item_id: Option<Uuid>,
        in_stock: Option<bool>,
    ) -> AppResult<PaginatedResponse<Lot>> {
        let only_in_stock = in_stock.unwrap_or(false);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM lots
            WHERE ($1::UUID IS NULL OR item_id = $1)
              AND (NOT $2 OR remaining_quantity > 0)
            "#,
        )
        .bind(item_id)
        .bind(only_in_stock)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, LotRow>(&format!(
            r#"
            {}
            WHERE ($1::UUID IS NULL OR l.item_id = $1)
              AND (NOT $2 OR l.remaining_quantity > 0)
            ORDER BY l.purchase_date DESC, l.id DESC
            LIMIT $3 OFFSET $4
            "#,
            LOT_SELECT
        ))
        .bind(item_id)
        .bind(only_in_stock)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Lot::from).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Get a lot by ID
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<Lot> {
        let row = sqlx::query_as::<_, LotRow>(&format!("{} WHERE l.id = $1", LOT_SELECT))
            .bind(lot_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        Ok(Lot::from(row))
    }

    /// Edit a lot.
    ///
    /// Once any quantity has been consumed the lot's identity (item,
    /// purchase date) is frozen, and the original quantity may not drop
    /// below what was already issued. A successful quantity edit keeps
    /// the issued amount fixed: `remaining = new_original - issued`.
    pub async fn update_lot(&self, lot_id: Uuid, input: UpdateLotInput) -> AppResult<Lot> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (Uuid, Decimal, Decimal, Decimal, NaiveDate)>(
            r#"
            SELECT item_id, original_quantity, remaining_quantity, unit_price, purchase_date
            FROM lots WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let (item_id, original, remaining, unit_price, purchase_date) = row;
        let already_issued = original - remaining;
        let untouched = already_issued == Decimal::ZERO;

        let new_item_id = input.item_id.unwrap_or(item_id);
        if new_item_id != item_id && !untouched {
            return Err(AppError::Conflict {
                resource: "lot".to_string(),
                message: "Cannot move a lot to another item once stock has been consumed from it"
                    .to_string(),
            });
        }
        if new_item_id != item_id {
            let item_exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE id = $1")
                    .bind(new_item_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if item_exists == 0 {
                return Err(AppError::NotFound("Item".to_string()));
            }
        }

        let new_purchase_date = input.purchase_date.unwrap_or(purchase_date);
        if new_purchase_date != purchase_date && !untouched {
            return Err(AppError::Conflict {
                resource: "lot".to_string(),
                message:
                    "Cannot change the purchase date once stock has been consumed from the lot"
                        .to_string(),
            });
        }

        let new_original = input.original_quantity.unwrap_or(original);
        validate_quantity(new_original).map_err(|msg| AppError::Validation {
            field: "original_quantity".to_string(),
            message: msg.to_string(),
        })?;
        if new_original < already_issued {
            return Err(AppError::Conflict {
                resource: "lot".to_string(),
                message: format!(
                    "{} has already been issued from this lot; the quantity cannot be reduced below that",
                    already_issued
                ),
            });
        }
        let new_remaining = new_original - already_issued;

        let new_unit_price = input.unit_price.unwrap_or(unit_price);
        validate_price(new_unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;

        sqlx::query(
            r#"
            UPDATE lots
            SET item_id = $1, original_quantity = $2, remaining_quantity = $3, unit_price = $4,
                purchase_date = $5,
                supplier = COALESCE($6, supplier),
                invoice_number = COALESCE($7, invoice_number),
                attachment_ref = COALESCE($8, attachment_ref),
                updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(new_item_id)
        .bind(new_original)
        .bind(new_remaining)
        .bind(new_unit_price)
        .bind(new_purchase_date)
        .bind(&input.supplier)
        .bind(&input.invoice_number)
        .bind(&input.attachment_ref)
        .bind(lot_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_lot(lot_id).await
    }

    /// Delete a lot. Only allowed while nothing has been consumed from it.
    pub async fn delete_lot(&self, lot_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let quantities = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT original_quantity, remaining_quantity FROM lots WHERE id = $1 FOR UPDATE",
        )
        .bind(lot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        if quantities.0 != quantities.1 {
            return Err(AppError::Conflict {
                resource: "lot".to_string(),
                message: "Stock has already been consumed from this lot; it cannot be deleted"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Origin stock view for one item: open lots in consumption order
    /// plus the total still on hand
    pub async fn item_stock(&self, item_id: Uuid) -> AppResult<ItemStock> {
        let item = sqlx::query_as::<_, (String, String)>(
            "SELECT name, unit FROM items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        let rows = sqlx::query_as::<_, (Uuid, NaiveDate, Decimal, Decimal)>(
            r#"
            SELECT id, purchase_date, remaining_quantity, unit_price
            FROM lots
            WHERE item_id = $1 AND remaining_quantity > 0
            ORDER BY purchase_date ASC, id ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        let open_lots: Vec<OpenLot> = rows
            .into_iter()
            .map(|(lot_id, purchase_date, remaining_quantity, unit_price)| OpenLot {
                lot_id,
                purchase_date,
                remaining_quantity,
                unit_price,
            })
            .collect();
        let total_remaining = open_lots.iter().map(|l| l.remaining_quantity).sum();

        Ok(ItemStock {
            item_id,
            item_name: item.0,
            unit: item.1,
            total_remaining,
            open_lots,
        })
    }
}
