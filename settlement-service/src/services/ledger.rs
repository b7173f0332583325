//! Wallet and account ledger primitives.
//!
//! Balance mutations are single atomic conditional updates: the filter
//! carries the guards (frozen flag, sufficient balance) and `$inc` applies
//! the movement, so two concurrent settlements cannot both pass a stale
//! balance check. The paired transaction record is written after the
//! balance row; the store offers no multi-document transactions, so a crash
//! between the two writes leaves a balance without its record.

use chrono::Utc;
use mongodb::bson::DateTime as BsonDateTime;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Account, AccountTransaction, EntryKind, TxCategory, TxReference, Wallet, WalletTransaction,
};
use crate::services::metrics::{DB_QUERY_DURATION, WALLET_ENTRIES_TOTAL};
use crate::services::repository::{next_sequence, Counter};

/// Context for an account ledger entry.
#[derive(Debug, Clone)]
pub struct AccountEntryContext {
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub unit_id: Option<Uuid>,
    pub created_by: Uuid,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct LedgerService {
    wallets: Collection<Wallet>,
    wallet_transactions: Collection<WalletTransaction>,
    accounts: Collection<Account>,
    account_transactions: Collection<AccountTransaction>,
    counters: Collection<Counter>,
}

impl LedgerService {
    pub fn new(db: &Database) -> Self {
        Self {
            wallets: db.collection("wallets"),
            wallet_transactions: db.collection("wallet_transactions"),
            accounts: db.collection("accounts"),
            account_transactions: db.collection("account_transactions"),
            counters: db.collection("counters"),
        }
    }

    /// Initialize ledger indexes: one wallet per client, history ordered by
    /// processing time.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let client_idx = IndexModel::builder()
            .keys(doc! { "client_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("wallet_client_idx".to_string())
                    .build(),
            )
            .build();
        self.wallets.create_indexes([client_idx], None).await?;

        let history_idx = IndexModel::builder()
            .keys(doc! { "wallet_id": 1, "processed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("wallet_tx_history_idx".to_string())
                    .build(),
            )
            .build();
        let category_idx = IndexModel::builder()
            .keys(doc! { "kind": 1, "category": 1 })
            .options(
                IndexOptions::builder()
                    .name("wallet_tx_category_idx".to_string())
                    .build(),
            )
            .build();
        self.wallet_transactions
            .create_indexes([history_idx, category_idx], None)
            .await?;

        let account_history_idx = IndexModel::builder()
            .keys(doc! { "account_id": 1, "transaction_date": -1 })
            .options(
                IndexOptions::builder()
                    .name("account_tx_history_idx".to_string())
                    .build(),
            )
            .build();
        self.account_transactions
            .create_indexes([account_history_idx], None)
            .await?;

        info!("Ledger indexes initialized");
        Ok(())
    }

    /// Credit a client wallet and append the matching transaction record.
    #[instrument(skip(self, description, reference), fields(client_id = %client_id, amount = amount))]
    pub async fn credit_wallet(
        &self,
        client_id: Uuid,
        amount: f64,
        description: String,
        category: TxCategory,
        reference: TxReference,
        created_by: Uuid,
    ) -> Result<WalletTransaction, AppError> {
        self.apply_wallet_entry(
            client_id,
            EntryKind::Credit,
            amount,
            description,
            category,
            reference,
            created_by,
        )
        .await
    }

    /// Debit a client wallet. Fails without mutation when the wallet is
    /// missing, frozen, or short of funds.
    #[instrument(skip(self, description, reference), fields(client_id = %client_id, amount = amount))]
    pub async fn debit_wallet(
        &self,
        client_id: Uuid,
        amount: f64,
        description: String,
        category: TxCategory,
        reference: TxReference,
        created_by: Uuid,
    ) -> Result<WalletTransaction, AppError> {
        self.apply_wallet_entry(
            client_id,
            EntryKind::Debit,
            amount,
            description,
            category,
            reference,
            created_by,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_wallet_entry(
        &self,
        client_id: Uuid,
        kind: EntryKind,
        amount: f64,
        description: String,
        category: TxCategory,
        reference: TxReference,
        created_by: Uuid,
    ) -> Result<WalletTransaction, AppError> {
        if amount <= 0.0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "ledger entry amount must be positive, got {}",
                amount
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_wallet_entry"])
            .start_timer();

        let now = BsonDateTime::now();
        let mut filter = doc! {
            "client_id": client_id.to_string(),
            "is_frozen": false,
        };
        let update = match kind {
            EntryKind::Credit => doc! {
                "$inc": { "balance": amount, "total_credits": amount },
                "$set": { "last_transaction_at": now, "updated_at": now },
            },
            EntryKind::Debit => {
                filter.insert("balance", doc! { "$gte": amount });
                doc! {
                    "$inc": { "balance": -amount, "total_debits": amount },
                    "$set": { "last_transaction_at": now, "updated_at": now },
                }
            }
        };

        let updated = self
            .wallets
            .find_one_and_update(
                filter,
                update,
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        let wallet = match updated {
            Some(wallet) => wallet,
            None => {
                timer.observe_duration();
                let err = self.classify_wallet_miss(client_id, kind, amount).await?;
                WALLET_ENTRIES_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                warn!(client_id = %client_id, kind = %kind, error = %err, "wallet entry rejected");
                return Err(err);
            }
        };

        let transaction_id = self.next_wallet_transaction_id().await?;
        let transaction = WalletTransaction::for_applied_entry(
            &wallet,
            transaction_id,
            kind,
            amount,
            description,
            category,
            reference,
            created_by,
        );
        self.wallet_transactions
            .insert_one(&transaction, None)
            .await?;

        timer.observe_duration();
        WALLET_ENTRIES_TOTAL
            .with_label_values(&[kind.as_str(), "ok"])
            .inc();
        info!(
            client_id = %client_id,
            kind = %kind,
            amount = amount,
            balance_after = wallet.balance,
            "wallet entry applied"
        );
        Ok(transaction)
    }

    /// The guarded update missed; read the wallet once to say why.
    async fn classify_wallet_miss(
        &self,
        client_id: Uuid,
        kind: EntryKind,
        amount: f64,
    ) -> Result<AppError, AppError> {
        let wallet = self
            .wallets
            .find_one(doc! { "client_id": client_id.to_string() }, None)
            .await?;
        let err = match wallet {
            None => AppError::NotFound(anyhow::anyhow!("wallet not found for client {}", client_id)),
            Some(wallet) => match kind {
                EntryKind::Credit => wallet.ensure_can_credit().err().unwrap_or_else(|| {
                    AppError::Conflict(anyhow::anyhow!(
                        "wallet for client {} changed concurrently",
                        client_id
                    ))
                }),
                EntryKind::Debit => wallet.ensure_can_debit(amount).err().unwrap_or_else(|| {
                    AppError::Conflict(anyhow::anyhow!(
                        "wallet for client {} changed concurrently",
                        client_id
                    ))
                }),
            },
        };
        Ok(err)
    }

    async fn next_wallet_transaction_id(&self) -> Result<String, AppError> {
        let seq = next_sequence(&self.counters, "wallet_transaction_id").await?;
        Ok(format!("WT-{}-{}", Utc::now().timestamp_millis(), seq))
    }

    /// Find the ledger account owned by a user, e.g. a staff payout account.
    pub async fn find_account_by_user(&self, user_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = self
            .accounts
            .find_one(doc! { "user_id": user_id.to_string() }, None)
            .await?;
        Ok(account)
    }

    /// Apply a credit or debit to a user account. A missing account is a
    /// non-fatal skip: the entry is dropped with a warning and `None` is
    /// returned.
    #[instrument(skip(self, ctx), fields(account_id = %account_id, kind = %kind, amount = amount))]
    pub async fn apply_account_entry(
        &self,
        account_id: Uuid,
        kind: EntryKind,
        amount: f64,
        ctx: AccountEntryContext,
    ) -> Result<Option<AccountTransaction>, AppError> {
        if amount <= 0.0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "ledger entry amount must be positive, got {}",
                amount
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_account_entry"])
            .start_timer();

        let update = match kind {
            EntryKind::Credit => doc! {
                "$inc": { "balance": amount, "total_in": amount },
                "$set": { "updated_at": BsonDateTime::now() },
            },
            EntryKind::Debit => doc! {
                "$inc": { "balance": -amount, "total_out": amount },
                "$set": { "updated_at": BsonDateTime::now() },
            },
        };

        let updated = self
            .accounts
            .find_one_and_update(
                doc! { "_id": account_id.to_string() },
                update,
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        let account = match updated {
            Some(account) => account,
            None => {
                timer.observe_duration();
                warn!(account_id = %account_id, "account not found, skipping ledger entry");
                return Ok(None);
            }
        };

        let transaction = AccountTransaction {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            balance_after: account.balance,
            description: ctx.description,
            reference_type: ctx.reference_type,
            reference_id: ctx.reference_id,
            payment_method: ctx.payment_method,
            user_id: account.user_id,
            unit_id: ctx.unit_id.or(account.unit_id),
            transaction_date: Utc::now(),
            created_by: ctx.created_by,
            notes: ctx.notes,
        };
        self.account_transactions
            .insert_one(&transaction, None)
            .await?;

        timer.observe_duration();
        info!(
            account_id = %account_id,
            kind = %kind,
            amount = amount,
            balance_after = account.balance,
            "account entry applied"
        );
        Ok(Some(transaction))
    }
}
