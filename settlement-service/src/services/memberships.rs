//! Membership provisioning for bills carrying membership purchases.
//!
//! Value-added purchases become wallet credits; every other type becomes a
//! client membership record. The batch is best-effort: a bad line is logged
//! and skipped, the rest still provision.

use chrono::Utc;
use mongodb::{bson::doc, Collection, Database, IndexModel};
use mongodb::options::IndexOptions;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    end_date_from, ClientMembership, MembershipLine, MembershipStatus, MembershipType, TxCategory,
    TxReference,
};
use crate::services::ledger::LedgerService;
use crate::services::metrics::DB_QUERY_DURATION;

/// Outcome of a provisioning batch.
#[derive(Debug, Default)]
pub struct ProvisionResult {
    pub wallet_credits: usize,
    pub memberships_created: usize,
    pub failures: Vec<String>,
}

impl ProvisionResult {
    pub fn applied(&self) -> usize {
        self.wallet_credits + self.memberships_created
    }
}

#[derive(Clone)]
pub struct MembershipService {
    memberships: Collection<ClientMembership>,
    ledger: LedgerService,
}

impl MembershipService {
    pub fn new(db: &Database, ledger: LedgerService) -> Self {
        Self {
            memberships: db.collection("client_memberships"),
            ledger,
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let client_idx = IndexModel::builder()
            .keys(doc! { "client_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("client_membership_idx".to_string())
                    .build(),
            )
            .build();
        self.memberships.create_indexes([client_idx], None).await?;
        info!("Membership indexes initialized");
        Ok(())
    }

    /// Provision every membership line on a bill for `client_id`.
    #[instrument(skip(self, lines), fields(client_id = %client_id, count = lines.len()))]
    pub async fn provision(
        &self,
        lines: &[MembershipLine],
        client_id: Uuid,
        created_by: Uuid,
    ) -> ProvisionResult {
        let mut result = ProvisionResult::default();

        for line in lines {
            let outcome = match line.membership_type {
                MembershipType::ValueAdded => self
                    .credit_value_added(line, client_id, created_by)
                    .await
                    .map(|_| true),
                MembershipType::FixDiscount | MembershipType::ServiceDiscount => self
                    .create_membership(line, client_id, created_by)
                    .await
                    .map(|_| false),
            };
            match outcome {
                Ok(true) => result.wallet_credits += 1,
                Ok(false) => result.memberships_created += 1,
                Err(err) => {
                    warn!(membership = %line.name, error = %err, "membership line failed, continuing batch");
                    result.failures.push(format!("{}: {}", line.name, err));
                }
            }
        }

        info!(
            client_id = %client_id,
            applied = result.applied(),
            failed = result.failures.len(),
            "membership provisioning done"
        );
        result
    }

    async fn credit_value_added(
        &self,
        line: &MembershipLine,
        client_id: Uuid,
        created_by: Uuid,
    ) -> Result<(), AppError> {
        let amount = line.benefits.value_added_amount;
        if amount <= 0.0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "value-added membership {} has no credit amount",
                line.name
            )));
        }
        self.ledger
            .credit_wallet(
                client_id,
                amount,
                format!("Value added from membership: {}", line.name),
                TxCategory::MembershipCredit,
                TxReference::for_membership(line.membership_id, &line.name),
                created_by,
            )
            .await?;
        Ok(())
    }

    async fn create_membership(
        &self,
        line: &MembershipLine,
        client_id: Uuid,
        created_by: Uuid,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_membership"])
            .start_timer();

        let start_date = Utc::now();
        let membership = ClientMembership {
            id: Uuid::new_v4(),
            client_id,
            membership_id: line.membership_id,
            membership_name: line.name.clone(),
            membership_type: line.membership_type,
            purchase_amount: line.pricing.purchase_amount,
            start_date,
            end_date: end_date_from(start_date, &line.duration),
            is_active: true,
            status: MembershipStatus::Active,
            benefits: line.benefits.clone(),
            duration: line.duration,
            created_by,
            created_at: start_date,
        };
        self.memberships.insert_one(&membership, None).await?;

        timer.observe_duration();
        Ok(())
    }
}
