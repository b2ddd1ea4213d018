//! Issuance service: store-to-destination transfers with FIFO consumption
//! and full reversal on edit/delete

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    Issuance, IssuanceDetail, IssuanceLine, IssuanceLineDetail, LotConsumption,
};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_date_range, validate_quantity};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::stock;

/// Service for issuing stock from the store to bars and kitchens
#[derive(Clone)]
pub struct IssuanceService {
    db: PgPool,
}

/// One requested line of an issuance
#[derive(Debug, Deserialize)]
pub struct IssuanceLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating an issuance
#[derive(Debug, Deserialize)]
pub struct CreateIssuanceInput {
    pub destination_id: Uuid,
    pub issue_date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<IssuanceLineInput>,
}

/// Input for editing an issuance: the full replacement state
#[derive(Debug, Deserialize)]
pub struct UpdateIssuanceInput {
    pub destination_id: Uuid,
    pub issue_date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<IssuanceLineInput>,
}

type IssuanceRow = (
    Uuid,
    Uuid,
    String,
    NaiveDate,
    Option<String>,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

const ISSUANCE_SELECT: &str = r#"
    SELECT iss.id, iss.destination_id, d.name AS destination_name, iss.issue_date,
           iss.notes, iss.created_by, iss.created_at, iss.updated_at
    FROM issuances iss
    JOIN destinations d ON d.id = iss.destination_id
"#;

fn issuance_from_row(row: IssuanceRow) -> Issuance {
    let (id, destination_id, destination_name, issue_date, notes, created_by, created_at, updated_at) =
        row;
    Issuance {
        id,
        destination_id,
        destination_name,
        issue_date,
        notes,
        created_by,
        created_at,
        updated_at,
    }
}

fn validate_lines(lines: &[IssuanceLineInput]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "lines".to_string(),
            message: "An issuance needs at least one line".to_string(),
        });
    }
    for line in lines {
        validate_quantity(line.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
    }
    Ok(())
}

/// Backdating is an admin-only correction tool
fn check_backdating(date: NaiveDate, user: &AuthUser) -> AppResult<()> {
    if date != Utc::now().date_naive() && !user.is_admin() {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

impl IssuanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Issue stock to a destination.
    ///
    /// All lines succeed or the whole issuance aborts; a shortfall on any
    /// line leaves every lot untouched.
    pub async fn create_issuance(
        &self,
        user: &AuthUser,
        input: CreateIssuanceInput,
    ) -> AppResult<IssuanceDetail> {
        validate_lines(&input.lines)?;
        check_backdating(input.issue_date, user)?;

        let mut tx = self.db.begin().await?;

        ensure_destination(&mut tx, input.destination_id).await?;

        let issuance_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO issuances (destination_id, issue_date, notes, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.destination_id)
        .bind(input.issue_date)
        .bind(&input.notes)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        apply_lines(&mut tx, issuance_id, input.destination_id, &input.lines).await?;

        tx.commit().await?;

        tracing::info!(
            "{} issued {} line(s) to destination {} (issuance {})",
            user.username,
            input.lines.len(),
            input.destination_id,
            issuance_id
        );

        self.get_issuance(issuance_id).await
    }

    /// List issuance headers, newest first
    pub async fn list_issuances(
        &self,
        pagination: Pagination,
        destination_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<PaginatedResponse<Issuance>> {
        if let (Some(start), Some(end)) = (start, end) {
            validate_date_range(start, end).map_err(|msg| AppError::Validation {
                field: "date_range".to_string(),
                message: msg.to_string(),
            })?;
        }

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM issuances
            WHERE ($1::UUID IS NULL OR destination_id = $1)
              AND ($2::DATE IS NULL OR issue_date >= $2)
              AND ($3::DATE IS NULL OR issue_date <= $3)
            "#,
        )
        .bind(destination_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, IssuanceRow>(&format!(
            r#"
            {}
            WHERE ($1::UUID IS NULL OR iss.destination_id = $1)
              AND ($2::DATE IS NULL OR iss.issue_date >= $2)
              AND ($3::DATE IS NULL OR iss.issue_date <= $3)
            ORDER BY iss.issue_date DESC, iss.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            ISSUANCE_SELECT
        ))
        .bind(destination_id)
        .bind(start)
        .bind(end)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(issuance_from_row).collect(),
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Full issuance view: header, lines, and per-lot breakdowns
    pub async fn get_issuance(&self, issuance_id: Uuid) -> AppResult<IssuanceDetail> {
        let header = sqlx::query_as::<_, IssuanceRow>(&format!(
            "{} WHERE iss.id = $1",
            ISSUANCE_SELECT
        ))
        .bind(issuance_id)
        .fetch_optional(&self.db)
        .await?
        .map(issuance_from_row)
        .ok_or_else(|| AppError::NotFound("Issuance".to_string()))?;

        let line_rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, Decimal)>(
            r#"
            SELECT il.id, il.issuance_id, il.item_id, i.name, il.quantity
            FROM issuance_lines il
            JOIN items i ON i.id = il.item_id
            WHERE il.issuance_id = $1
            ORDER BY il.created_at, il.id
            "#,
        )
        .bind(issuance_id)
        .fetch_all(&self.db)
        .await?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for (id, issuance_id, item_id, item_name, quantity) in line_rows {
            let consumed_lots = sqlx::query_as::<_, (Uuid, Decimal, i32)>(
                r#"
                SELECT lot_id, quantity, position
                FROM lot_consumptions
                WHERE issuance_line_id = $1
                ORDER BY position
                "#,
            )
            .bind(id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(|(lot_id, quantity, position)| LotConsumption {
                lot_id,
                quantity,
                position,
            })
            .collect();

            lines.push(IssuanceLineDetail {
                line: IssuanceLine {
                    id,
                    issuance_id,
                    item_id,
                    item_name,
                    quantity,
                },
                consumed_lots,
            });
        }

        Ok(IssuanceDetail {
            issuance: header,
            lines,
        })
    }

    /// Edit an issuance: reverse the old state in full, then re-apply the
    /// new lines as a fresh consumption against the restored stock.
    pub async fn update_issuance(
        &self,
        user: &AuthUser,
        issuance_id: Uuid,
        input: UpdateIssuanceInput,
    ) -> AppResult<IssuanceDetail> {
        validate_lines(&input.lines)?;
        check_backdating(input.issue_date, user)?;

        let mut tx = self.db.begin().await?;

        let old_destination_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT destination_id FROM issuances WHERE id = $1 FOR UPDATE",
        )
        .bind(issuance_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Issuance".to_string()))?;

        if input.destination_id != old_destination_id {
            ensure_destination(&mut tx, input.destination_id).await?;
        }

        reverse_lines(&mut tx, issuance_id, old_destination_id).await?;

        sqlx::query(
            r#"
            UPDATE issuances
            SET destination_id = $1, issue_date = $2, notes = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(input.destination_id)
        .bind(input.issue_date)
        .bind(&input.notes)
        .bind(issuance_id)
        .execute(&mut *tx)
        .await?;

        apply_lines(&mut tx, issuance_id, input.destination_id, &input.lines).await?;

        tx.commit().await?;

        tracing::info!("Re-applied issuance {} after edit", issuance_id);

        self.get_issuance(issuance_id).await
    }

    /// Delete an issuance: full reversal, no re-apply
    pub async fn delete_issuance(&self, issuance_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let destination_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT destination_id FROM issuances WHERE id = $1 FOR UPDATE",
        )
        .bind(issuance_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Issuance".to_string()))?;

        reverse_lines(&mut tx, issuance_id, destination_id).await?;

        sqlx::query("DELETE FROM issuances WHERE id = $1")
            .bind(issuance_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Reversed and deleted issuance {}", issuance_id);
        Ok(())
    }
}

async fn ensure_destination(
    tx: &mut Transaction<'_, Postgres>,
    destination_id: Uuid,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations WHERE id = $1")
        .bind(destination_id)
        .fetch_one(&mut **tx)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Destination".to_string()));
    }
    Ok(())
}

/// Consume and record each requested line, crediting the destination
async fn apply_lines(
    tx: &mut Transaction<'_, Postgres>,
    issuance_id: Uuid,
    destination_id: Uuid,
    lines: &[IssuanceLineInput],
) -> AppResult<()> {
    for line in lines {
        let item_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE id = $1")
                .bind(line.item_id)
                .fetch_one(&mut **tx)
                .await?;
        if item_exists == 0 {
            return Err(AppError::NotFound("Item".to_string()));
        }

        let draws = stock::consume(tx, line.item_id, line.quantity).await?;

        let line_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO issuance_lines (issuance_id, item_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(issuance_id)
        .bind(line.item_id)
        .bind(line.quantity)
        .fetch_one(&mut **tx)
        .await?;

        stock::persist_consumptions(tx, stock::ConsumptionOwner::IssuanceLine(line_id), &draws)
            .await?;
        stock::credit_destination(tx, destination_id, line.item_id, line.quantity).await?;
    }
    Ok(())
}

/// Reverse every line of an issuance: restore the recorded draws onto
/// their lots and pull the quantities back out of the destination.
///
/// A destination that no longer holds the issued quantity blocks the
/// reversal; stock already sold downstream cannot be un-issued.
async fn reverse_lines(
    tx: &mut Transaction<'_, Postgres>,
    issuance_id: Uuid,
    destination_id: Uuid,
) -> AppResult<()> {
    let lines = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
        "SELECT id, item_id, quantity FROM issuance_lines WHERE issuance_id = $1",
    )
    .bind(issuance_id)
    .fetch_all(&mut **tx)
    .await?;

    for (line_id, item_id, quantity) in lines {
        let draws = stock::consumptions_for_line(tx, line_id).await?;
        stock::restore(tx, &draws).await?;
        stock::debit_destination(tx, destination_id, item_id, quantity).await?;
    }

    // Breakdown rows cascade with their lines
    sqlx::query("DELETE FROM issuance_lines WHERE issuance_id = $1")
        .bind(issuance_id)
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
            username: "storekeeper".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_backdated_issuance_requires_admin() {
        let last_week = Utc::now().date_naive() - chrono::Duration::days(7);

        let result = check_backdating(last_week, &user_with_role("staff"));
        assert!(matches!(result, Err(AppError::InsufficientPermissions)));

        assert!(check_backdating(last_week, &user_with_role("admin")).is_ok());
    }

    #[test]
    fn test_same_day_issuance_allowed_for_any_role() {
        let today = Utc::now().date_naive();
        assert!(check_backdating(today, &user_with_role("staff")).is_ok());
    }
}
