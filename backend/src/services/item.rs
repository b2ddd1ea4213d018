//! Stock item management service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Item, ItemType};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_name, validate_price, validate_unit};

use crate::error::{AppError, AppResult};

/// Service for managing stock-keeping units
#[derive(Clone)]
pub struct ItemService {
    db: PgPool,
}

type ItemRow = (
    Uuid,
    String,
    String,
    String,
    Decimal,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Input for creating an item
#[derive(Debug, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    pub unit: String,
    pub item_type: ItemType,
    pub unit_price: Decimal,
}

/// Input for updating an item; omitted fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub item_type: Option<ItemType>,
    pub unit_price: Option<Decimal>,
}

const ITEM_COLUMNS: &str =
    "id, name, unit, item_type, unit_price, created_by, created_at, updated_at";

fn item_from_row(row: ItemRow) -> AppResult<Item> {
    let (id, name, unit, item_type, unit_price, created_by, created_at, updated_at) = row;
    let item_type = ItemType::from_str(&item_type)
        .ok_or_else(|| AppError::Internal(format!("Unknown item type '{}'", item_type)))?;
    Ok(Item {
        id,
        name,
        unit,
        item_type,
        unit_price,
        created_by,
        created_at,
        updated_at,
    })
}

impl ItemService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a new stock item
    pub async fn create_item(&self, user_id: Uuid, input: CreateItemInput) -> AppResult<Item> {
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit(&input.unit).map_err(|msg| AppError::Validation {
            field: "unit".to_string(),
            message: msg.to_string(),
        })?;
        validate_price(input.unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
        })?;

        let name = input.name.trim().to_string();
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE name = $1")
            .bind(&name)
            .fetch_one(&self.db)
            .await?;
        if exists > 0 {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (name, unit, item_type, unit_price, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&name)
        .bind(input.unit.trim())
        .bind(input.item_type.as_str())
        .bind(input.unit_price)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        item_from_row(row)
    }

    /// List items, optionally filtered by classification
    pub async fn list_items(
        &self,
        pagination: Pagination,
        item_type: Option<ItemType>,
    ) -> AppResult<PaginatedResponse<Item>> {
        let type_filter = item_type.map(|t| t.as_str().to_string());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE ($1::TEXT IS NULL OR item_type = $1)",
        )
        .bind(&type_filter)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {}
            FROM items
            WHERE ($1::TEXT IS NULL OR item_type = $1)
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
            ITEM_COLUMNS
        ))
        .bind(&type_filter)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(item_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: Uuid) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        item_from_row(row)
    }

    /// Rename or retype an item. Allowed at any time; lots keep their own
    /// prices, so changing the reference price never rewrites stock value.
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<Item> {
        let existing = self.get_item(item_id).await?;

        let name = match input.name {
            Some(name) => {
                validate_name(&name).map_err(|msg| AppError::Validation {
                    field: "name".to_string(),
                    message: msg.to_string(),
                })?;
                name.trim().to_string()
            }
            None => existing.name,
        };
        let unit = match input.unit {
            Some(unit) => {
                validate_unit(&unit).map_err(|msg| AppError::Validation {
                    field: "unit".to_string(),
                    message: msg.to_string(),
                })?;
                unit.trim().to_string()
            }
            None => existing.unit,
        };
        let unit_price = match input.unit_price {
            Some(price) => {
                validate_price(price).map_err(|msg| AppError::Validation {
                    field: "unit_price".to_string(),
                    message: msg.to_string(),
                })?;
                price
            }
            None => existing.unit_price,
        };
        let item_type = input.item_type.unwrap_or(existing.item_type);

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE name = $1 AND id <> $2",
        )
        .bind(&name)
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;
        if duplicate > 0 {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items
            SET name = $1, unit = $2, item_type = $3, unit_price = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&name)
        .bind(&unit)
        .bind(item_type.as_str())
        .bind(unit_price)
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        item_from_row(row)
    }

    /// Delete an item. Rejected while any purchase lot references it.
    pub async fn delete_item(&self, item_id: Uuid) -> AppResult<()> {
        self.get_item(item_id).await?;

        let referenced =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lots WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&self.db)
                .await?;
        if referenced > 0 {
            return Err(AppError::Conflict {
                resource: "item".to_string(),
                message: "Item has purchase lots and cannot be deleted".to_string(),
            });
        }

        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
