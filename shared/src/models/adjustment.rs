//! Stock adjustment models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A manual stock correction with a mandatory reason
///
/// With no destination the correction is taken from the newest origin lot
/// still holding stock; with a destination it debits that destination's
/// counter and leaves origin lots alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub destination_id: Option<Uuid>,
    pub destination_name: Option<String>,
    pub quantity: Decimal,
    pub reason: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Adjustment {
    /// Whether this adjustment was taken directly from origin lots
    pub fn is_origin_side(&self) -> bool {
        self.destination_id.is_none()
    }
}
