//! Client wallet and its append-only transaction log.

use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxCategory {
    BillPayment,
    MembershipCredit,
    Refund,
    Adjustment,
    Bonus,
    Cashback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
}

/// Polymorphic pointer to whatever caused a wallet movement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxReference {
    pub bill_id: Option<Uuid>,
    pub bill_number: Option<String>,
    pub membership_id: Option<Uuid>,
    pub membership_name: Option<String>,
}

impl TxReference {
    pub fn for_bill(bill_id: Uuid, bill_number: &str) -> Self {
        Self {
            bill_id: Some(bill_id),
            bill_number: Some(bill_number.to_string()),
            ..Default::default()
        }
    }

    pub fn for_membership(membership_id: Option<Uuid>, membership_name: &str) -> Self {
        Self {
            membership_id,
            membership_name: Some(membership_name.to_string()),
            ..Default::default()
        }
    }
}

/// One wallet per client, enforced by a unique index on `client_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub total_credits: f64,
    #[serde(default)]
    pub total_debits: f64,
    pub last_transaction_at: Option<BsonDateTime>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_frozen: bool,
    pub freeze_reason: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Wallet {
    /// Guard for credits: frozen wallets accept no entries.
    pub fn ensure_can_credit(&self) -> Result<(), AppError> {
        if self.is_frozen {
            return Err(AppError::WalletFrozen(format!(
                "wallet for client {} is frozen",
                self.client_id
            )));
        }
        Ok(())
    }

    /// Guard for debits: frozen wallets and overdrafts are rejected.
    pub fn ensure_can_debit(&self, amount: f64) -> Result<(), AppError> {
        self.ensure_can_credit()?;
        if self.balance < amount {
            return Err(AppError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        Ok(())
    }
}

/// Immutable record of one wallet balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub client_id: Uuid,
    pub transaction_id: String,
    pub kind: EntryKind,
    pub amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub description: String,
    pub category: TxCategory,
    #[serde(default)]
    pub reference: TxReference,
    pub status: TxStatus,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub processed_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Build the record for an entry that was already applied to `wallet`.
    ///
    /// `wallet` is the post-update snapshot; the before-balance is recovered
    /// from the entry direction.
    #[allow(clippy::too_many_arguments)]
    pub fn for_applied_entry(
        wallet: &Wallet,
        transaction_id: String,
        kind: EntryKind,
        amount: f64,
        description: String,
        category: TxCategory,
        reference: TxReference,
        created_by: Uuid,
    ) -> Self {
        let balance_after = wallet.balance;
        let balance_before = match kind {
            EntryKind::Credit => balance_after - amount,
            EntryKind::Debit => balance_after + amount,
        };
        Self {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            client_id: wallet.client_id,
            transaction_id,
            kind,
            amount,
            balance_before,
            balance_after,
            description,
            category,
            reference,
            status: TxStatus::Completed,
            created_by,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(balance: f64, frozen: bool) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            balance,
            total_credits: 0.0,
            total_debits: 0.0,
            last_transaction_at: None,
            is_active: true,
            is_frozen: frozen,
            freeze_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn debit_guard_rejects_overdraft() {
        let w = wallet(100.0, false);
        let err = w.ensure_can_debit(150.0).unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));
    }

    #[test]
    fn frozen_wallet_blocks_both_directions() {
        let w = wallet(500.0, true);
        assert!(matches!(
            w.ensure_can_credit(),
            Err(AppError::WalletFrozen(_))
        ));
        assert!(matches!(
            w.ensure_can_debit(10.0),
            Err(AppError::WalletFrozen(_))
        ));
    }

    #[test]
    fn applied_entry_snapshot_is_consistent() {
        let mut w = wallet(250.0, false);
        // Simulate the store applying a 100 credit before the record is cut.
        w.balance += 100.0;
        let tx = WalletTransaction::for_applied_entry(
            &w,
            "WT-1".into(),
            EntryKind::Credit,
            100.0,
            "test".into(),
            TxCategory::MembershipCredit,
            TxReference::default(),
            Uuid::new_v4(),
        );
        assert_eq!(tx.balance_before, 250.0);
        assert_eq!(tx.balance_after, 350.0);
        assert_eq!(tx.balance_after - tx.balance_before, tx.amount);
    }
}
