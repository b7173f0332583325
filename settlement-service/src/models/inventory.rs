//! Per-unit product stock and its movement history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub product_id: Uuid,
    pub unit_id: Uuid,
    /// Stock on hand. Sales apply no floor, so this can go negative.
    #[serde(default)]
    pub qty: i64,
    #[serde(default)]
    pub stock_in: i64,
    #[serde(default)]
    pub stock_out: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    In,
    Out,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReference {
    Purchase,
    Sale,
    Return,
    Damage,
    Manual,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub product_id: Uuid,
    pub unit_id: Uuid,
    pub kind: MovementKind,
    pub qty: i64,
    pub previous_qty: i64,
    pub new_qty: i64,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: MovementReference,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
