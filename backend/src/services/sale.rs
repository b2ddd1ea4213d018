//! Destination-local sale service
//!
//! Sales draw on the destination's own counter, never on origin lots;
//! provenance already moved at issuance time, so voiding or deleting a
//! sale restores the counter only.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{Sale, SaleDetail, SaleLine, SaleStatus};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_date_range, validate_price, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::stock;

/// Service for sales recorded against bar/kitchen stock
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// One sold line. The price is caller-supplied: the ledger copies prices
/// forward, it never computes them.
#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input for creating a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub destination_id: Uuid,
    pub sale_date: NaiveDate,
    #[serde(default)]
    pub status: Option<SaleStatus>,
    pub lines: Vec<SaleLineInput>,
}

/// Input for editing a sale: the full replacement state
#[derive(Debug, Deserialize)]
pub struct UpdateSaleInput {
    pub destination_id: Uuid,
    pub sale_date: NaiveDate,
    pub lines: Vec<SaleLineInput>,
}

/// Input for flipping the payment status
#[derive(Debug, Deserialize)]
pub struct UpdateSaleStatusInput {
    pub status: SaleStatus,
}

type SaleRow = (
    Uuid,
    Uuid,
    String,
    NaiveDate,
    String,
    Option<DateTime<Utc>>,
    Decimal,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

const SALE_SELECT: &str = r#"
    SELECT s.id, s.destination_id, d.name AS destination_name, s.sale_date, s.status,
           s.voided_at, s.total, s.created_by, s.created_at, s.updated_at
    FROM sales s
    JOIN destinations d ON d.id = s.destination_id
"#;

fn sale_from_row(row: SaleRow) -> AppResult<Sale> {
    let (
        id,
        destination_id,
        destination_name,
        sale_date,
        status,
        voided_at,
        total,
        created_by,
        created_at,
        updated_at,
    ) = row;
    let status = SaleStatus::from_str(&status)
        .ok_or_else(|| AppError::Internal(format!("Unknown sale status '{}'", status)))?;
    Ok(Sale {
        id,
        destination_id,
        destination_name,
        sale_date,
        status,
        voided_at,
        total,
        created_by,
        created_at,
        updated_at,
    })
}

fn validate_lines(lines: &[SaleLineInput]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "lines".to_string(),
            message: "A sale needs at least one line".to_string(),
        });
    }
    for line in lines {
        validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_price(line.unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;
    }
    Ok(())
}

fn check_backdating(date: NaiveDate, user: &AuthUser) -> AppResult<()> {
    if date != Utc::now().date_naive() && !user.is_admin() {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

impl SaleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale against a destination's stock.
    ///
    /// Any line the destination cannot cover aborts the whole sale.
    pub async fn create_sale(&self, user: &AuthUser, input: CreateSaleInput) -> AppResult<SaleDetail> {
        validate_lines(&input.lines)?;
        check_backdating(input.sale_date, user)?;

        let mut tx = self.db.begin().await?;

        let destination_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations WHERE id = $1")
                .bind(input.destination_id)
                .fetch_one(&mut *tx)
                .await?;
        if destination_exists == 0 {
            return Err(AppError::NotFound("Destination".to_string()));
        }

        let status = input.status.unwrap_or(SaleStatus::Unpaid);
        let total: Decimal = input
            .lines
            .iter()
            .map(|l| l.quantity * l.unit_price)
            .sum();

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (destination_id, sale_date, status, total, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.destination_id)
        .bind(input.sale_date)
        .bind(status.as_str())
        .bind(total)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        apply_lines(&mut tx, sale_id, input.destination_id, &input.lines).await?;

        tx.commit().await?;

        tracing::info!(
            "{} recorded sale {} at destination {} for {}",
            user.username,
            sale_id,
            input.destination_id,
            total
        );

        self.get_sale(sale_id).await
    }

    /// List sale headers, newest first. Voided sales are included only on
    /// request.
    pub async fn list_sales(
        &self,
        pagination: Pagination,
        destination_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        include_voided: bool,
    ) -> AppResult<PaginatedResponse<Sale>> {
        if let (Some(start), Some(end)) = (start, end) {
            validate_date_range(start, end).map_err(|msg| AppError::Validation {
                field: "date_range".to_string(),
                message: msg.to_string(),
            })?;
        }

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE ($1::UUID IS NULL OR destination_id = $1)
              AND ($2::DATE IS NULL OR sale_date >= $2)
              AND ($3::DATE IS NULL OR sale_date <= $3)
              AND ($4 OR voided_at IS NULL)
            "#,
        )
        .bind(destination_id)
        .bind(start)
        .bind(end)
        .bind(include_voided)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            {}
            WHERE ($1::UUID IS NULL OR s.destination_id = $1)
              AND ($2::DATE IS NULL OR s.sale_date >= $2)
              AND ($3::DATE IS NULL OR s.sale_date <= $3)
              AND ($4 OR s.voided_at IS NULL)
            ORDER BY s.sale_date DESC, s.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            SALE_SELECT
        ))
        .bind(destination_id)
        .bind(start)
        .bind(end)
        .bind(include_voided)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(sale_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Full sale view: header plus lines
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let header = sqlx::query_as::<_, SaleRow>(&format!("{} WHERE s.id = $1", SALE_SELECT))
            .bind(sale_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;
        let sale = sale_from_row(header)?;

        let lines = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, Decimal, Decimal, Decimal)>(
            r#"
            SELECT sl.id, sl.sale_id, sl.item_id, i.name, sl.quantity, sl.unit_price, sl.line_total
            FROM sale_lines sl
            JOIN items i ON i.id = sl.item_id
            WHERE sl.sale_id = $1
            ORDER BY sl.created_at, sl.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(
            |(id, sale_id, item_id, item_name, quantity, unit_price, line_total)| SaleLine {
                id,
                sale_id,
                item_id,
                item_name,
                quantity,
                unit_price,
                line_total,
            },
        )
        .collect();

        Ok(SaleDetail { sale, lines })
    }

    /// Edit a sale: restore the old lines to the destination counters,
    /// then debit the new lines. Voided sales cannot be edited.
    pub async fn update_sale(
        &self,
        user: &AuthUser,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> AppResult<SaleDetail> {
        validate_lines(&input.lines)?;
        check_backdating(input.sale_date, user)?;

        let mut tx = self.db.begin().await?;

        let old = lock_sale(&mut tx, sale_id).await?;
        if old.voided_at.is_some() {
            return Err(AppError::InvalidStateTransition(
                "A voided sale cannot be edited".to_string(),
            ));
        }

        if input.destination_id != old.destination_id {
            let destination_exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations WHERE id = $1")
                    .bind(input.destination_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if destination_exists == 0 {
                return Err(AppError::NotFound("Destination".to_string()));
            }
        }

        reverse_lines(&mut tx, sale_id, old.destination_id).await?;

        let total: Decimal = input
            .lines
            .iter()
            .map(|l| l.quantity * l.unit_price)
            .sum();

        sqlx::query(
            r#"
            UPDATE sales
            SET destination_id = $1, sale_date = $2, total = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(input.destination_id)
        .bind(input.sale_date)
        .bind(total)
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        apply_lines(&mut tx, sale_id, input.destination_id, &input.lines).await?;

        tx.commit().await?;

        self.get_sale(sale_id).await
    }

    /// Void a sale: restore every line to the destination and stamp
    /// `voided_at`. Voiding twice is rejected.
    pub async fn void_sale(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        if sale.voided_at.is_some() {
            return Err(AppError::InvalidStateTransition(
                "Sale is already voided".to_string(),
            ));
        }

        restore_lines(&mut tx, sale_id, sale.destination_id).await?;

        sqlx::query("UPDATE sales SET voided_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Voided sale {}", sale_id);

        self.get_sale(sale_id).await
    }

    /// Delete a sale. A live sale is reversed first; a voided sale was
    /// already restored when it was voided.
    pub async fn delete_sale(&self, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        if sale.voided_at.is_none() {
            restore_lines(&mut tx, sale_id, sale.destination_id).await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Flip the payment status. No stock effect.
    pub async fn update_status(
        &self,
        sale_id: Uuid,
        input: UpdateSaleStatusInput,
    ) -> AppResult<SaleDetail> {
        let mut tx = self.db.begin().await?;

        let sale = lock_sale(&mut tx, sale_id).await?;
        if sale.voided_at.is_some() {
            return Err(AppError::InvalidStateTransition(
                "A voided sale's payment status cannot change".to_string(),
            ));
        }

        sqlx::query("UPDATE sales SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(input.status.as_str())
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_sale(sale_id).await
    }
}

struct LockedSale {
    destination_id: Uuid,
    voided_at: Option<DateTime<Utc>>,
}

async fn lock_sale(tx: &mut Transaction<'_, Postgres>, sale_id: Uuid) -> AppResult<LockedSale> {
    let row = sqlx::query_as::<_, (Uuid, Option<DateTime<Utc>>)>(
        "SELECT destination_id, voided_at FROM sales WHERE id = $1 FOR UPDATE",
    )
    .bind(sale_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

    Ok(LockedSale {
        destination_id: row.0,
        voided_at: row.1,
    })
}

/// Debit the destination for each sold line and persist the lines
async fn apply_lines(
    tx: &mut Transaction<'_, Postgres>,
    sale_id: Uuid,
    destination_id: Uuid,
    lines: &[SaleLineInput],
) -> AppResult<()> {
    for line in lines {
        stock::debit_destination(tx, destination_id, line.item_id, line.quantity).await?;

        sqlx::query(
            r#"
            INSERT INTO sale_lines (sale_id, item_id, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(sale_id)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.quantity * line.unit_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Restore every line's quantity to the destination counter
async fn restore_lines(
    tx: &mut Transaction<'_, Postgres>,
    sale_id: Uuid,
    destination_id: Uuid,
) -> AppResult<()> {
    let lines = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT item_id, quantity FROM sale_lines WHERE sale_id = $1",
    )
    .bind(sale_id)
    .fetch_all(&mut **tx)
    .await?;

    for (item_id, quantity) in lines {
        stock::restore_destination(tx, destination_id, item_id, quantity).await?;
    }
    Ok(())
}

/// Restore and delete the old lines during an edit
async fn reverse_lines(
    tx: &mut Transaction<'_, Postgres>,
    sale_id: Uuid,
    destination_id: Uuid,
) -> AppResult<()> {
    restore_lines(tx, sale_id, destination_id).await?;
    sqlx::query("DELETE FROM sale_lines WHERE sale_id = $1")
        .bind(sale_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "bartender".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_backdated_sale_requires_admin() {
        let yesterday = Utc::now().date_naive() - chrono::Duration::days(1);

        let result = check_backdating(yesterday, &user_with_role("staff"));
        assert!(matches!(result, Err(AppError::InsufficientPermissions)));

        assert!(check_backdating(yesterday, &user_with_role("admin")).is_ok());
    }

    #[test]
    fn test_same_day_sale_allowed_for_any_role() {
        let today = Utc::now().date_naive();
        assert!(check_backdating(today, &user_with_role("staff")).is_ok());
    }
}
