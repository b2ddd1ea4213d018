//! Destination (bar/kitchen) service: sub-locations and their inventory
//! counters

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Destination, DestinationKind, DestinationStock};
use shared::validation::{validate_name, validate_price};

use crate::error::{AppError, AppResult};

/// Service for managing destinations and their counter rows
#[derive(Clone)]
pub struct DestinationService {
    db: PgPool,
}

type DestinationRow = (Uuid, String, String, Uuid, DateTime<Utc>, DateTime<Utc>);

/// Input for creating a destination
#[derive(Debug, Deserialize)]
pub struct CreateDestinationInput {
    pub name: String,
    pub kind: DestinationKind,
}

/// Input for renaming a destination
#[derive(Debug, Deserialize)]
pub struct UpdateDestinationInput {
    pub name: String,
}

/// Input for editing a counter row's default selling price
#[derive(Debug, Deserialize)]
pub struct UpdateSellingPriceInput {
    pub selling_price: Decimal,
}

const DESTINATION_COLUMNS: &str = "id, name, kind, created_by, created_at, updated_at";

fn destination_from_row(row: DestinationRow) -> AppResult<Destination> {
    let (id, name, kind, created_by, created_at, updated_at) = row;
    let kind = DestinationKind::from_str(&kind)
        .ok_or_else(|| AppError::Internal(format!("Unknown destination kind '{}'", kind)))?;
    Ok(Destination {
        id,
        name,
        kind,
        created_by,
        created_at,
        updated_at,
    })
}

impl DestinationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a new destination
    pub async fn create_destination(
        &self,
        user_id: Uuid,
        input: CreateDestinationInput,
    ) -> AppResult<Destination> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let name = input.name.trim().to_string();
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations WHERE name = $1")
                .bind(&name)
                .fetch_one(&self.db)
                .await?;
        if exists > 0 {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            r#"
            INSERT INTO destinations (name, kind, created_by)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            DESTINATION_COLUMNS
        ))
        .bind(&name)
        .bind(input.kind.as_str())
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        destination_from_row(row)
    }

    /// List destinations, optionally filtered by kind
    pub async fn list_destinations(
        &self,
        kind: Option<DestinationKind>,
    ) -> AppResult<Vec<Destination>> {
        let kind_filter = kind.map(|k| k.as_str().to_string());
        let rows = sqlx::query_as::<_, DestinationRow>(&format!(
            r#"
            SELECT {}
            FROM destinations
            WHERE ($1::TEXT IS NULL OR kind = $1)
            ORDER BY name
            "#,
            DESTINATION_COLUMNS
        ))
        .bind(&kind_filter)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(destination_from_row).collect()
    }

    /// Get a destination by ID
    pub async fn get_destination(&self, destination_id: Uuid) -> AppResult<Destination> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            "SELECT {} FROM destinations WHERE id = $1",
            DESTINATION_COLUMNS
        ))
        .bind(destination_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Destination".to_string()))?;

        destination_from_row(row)
    }

    /// Rename a destination
    pub async fn update_destination(
        &self,
        destination_id: Uuid,
        input: UpdateDestinationInput,
    ) -> AppResult<Destination> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        self.get_destination(destination_id).await?;

        let name = input.name.trim().to_string();
        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM destinations WHERE name = $1 AND id <> $2",
        )
        .bind(&name)
        .bind(destination_id)
        .fetch_one(&self.db)
        .await?;
        if duplicate > 0 {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            r#"
            UPDATE destinations
            SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            DESTINATION_COLUMNS
        ))
        .bind(&name)
        .bind(destination_id)
        .fetch_one(&self.db)
        .await?;

        destination_from_row(row)
    }

    /// Delete a destination. Rejected while inventory counters, issuances,
    /// or sales still reference it.
    pub async fn delete_destination(&self, destination_id: Uuid) -> AppResult<()> {
        self.get_destination(destination_id).await?;

        let referenced = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM destination_inventory WHERE destination_id = $1)
                 + (SELECT COUNT(*) FROM issuances WHERE destination_id = $1)
                 + (SELECT COUNT(*) FROM sales WHERE destination_id = $1)
            "#,
        )
        .bind(destination_id)
        .fetch_one(&self.db)
        .await?;
        if referenced > 0 {
            return Err(AppError::Conflict {
                resource: "destination".to_string(),
                message: "Destination has stock, issuances, or sales and cannot be deleted"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM destinations WHERE id = $1")
            .bind(destination_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// All counter rows for a destination
    pub async fn destination_inventory(
        &self,
        destination_id: Uuid,
    ) -> AppResult<Vec<DestinationStock>> {
        self.get_destination(destination_id).await?;

        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, Decimal, Decimal, DateTime<Utc>)>(
            r#"
            SELECT di.destination_id, di.item_id, i.name, i.unit, di.quantity,
                   di.selling_price, di.updated_at
            FROM destination_inventory di
            JOIN items i ON i.id = di.item_id
            WHERE di.destination_id = $1
            ORDER BY i.name
            "#,
        )
        .bind(destination_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(destination_id, item_id, item_name, unit, quantity, selling_price, updated_at)| {
                    DestinationStock {
                        destination_id,
                        item_id,
                        item_name,
                        unit,
                        quantity,
                        selling_price,
                        updated_at,
                    }
                },
            )
            .collect())
    }

    /// Edit the default selling price on one counter row
    pub async fn update_selling_price(
        &self,
        destination_id: Uuid,
        item_id: Uuid,
        input: UpdateSellingPriceInput,
    ) -> AppResult<()> {
        validate_price(input.selling_price).map_err(|msg| AppError::Validation {
            field: "selling_price".to_string(),
            message: msg.to_string(),
        })?;

        let updated = sqlx::query(
            r#"
            UPDATE destination_inventory
            SET selling_price = $1, updated_at = NOW()
            WHERE destination_id = $2 AND item_id = $3
            "#,
        )
        .bind(input.selling_price)
        .bind(destination_id)
        .bind(item_id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Destination inventory".to_string()));
        }
        Ok(())
    }
}
