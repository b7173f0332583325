//! User accounts: the generalized ledger for staff payouts and transfers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::wallet::EntryKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Income,
    Expense,
    Asset,
    Liability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub account_name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub total_in: f64,
    #[serde(default)]
    pub total_out: f64,
    /// Owning user (staff member for payout accounts).
    pub user_id: Uuid,
    pub unit_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Account movements record only the post-entry balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: EntryKind,
    pub amount: f64,
    pub balance_after: f64,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub user_id: Uuid,
    pub unit_id: Option<Uuid>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub transaction_date: DateTime<Utc>,
    pub created_by: Uuid,
    pub notes: Option<String>,
}
