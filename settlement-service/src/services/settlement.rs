//! Bill settlement orchestrator.
//!
//! Persisting the bill is the one operation whose failure reaches the
//! caller. Every downstream step (memberships, wallet debit, incentives,
//! inventory, dashboard) is isolated: a failing step is recorded on the
//! settlement report and the chain continues.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Bill, BillPatch, BillStatus, IncentiveOutcome, MembershipLine, NewBill, ProductLine,
    ServiceLine, TxCategory, TxReference,
};
use crate::services::dashboard::DashboardService;
use crate::services::incentives::compute_incentives;
use crate::services::inventory::InventoryService;
use crate::services::ledger::LedgerService;
use crate::services::memberships::MembershipService;
use crate::services::metrics::{ERRORS_TOTAL, SETTLEMENTS_TOTAL, SIDE_EFFECTS_TOTAL};
use crate::services::repository::{BillRepository, DirectoryService};

/// Steps of the settlement side-effect chain, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStep {
    Memberships,
    WalletDebit,
    Incentives,
    ServiceInventory,
    ProductInventory,
    DashboardFold,
}

impl SettlementStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memberships => "memberships",
            Self::WalletDebit => "wallet_debit",
            Self::Incentives => "incentives",
            Self::ServiceInventory => "service_inventory",
            Self::ProductInventory => "product_inventory",
            Self::DashboardFold => "dashboard_fold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Applied,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: SettlementStep,
    pub status: StepStatus,
    pub detail: String,
}

/// Per-step outcomes of one settlement, returned alongside the bill so the
/// caller sees partial failures instead of silent under-application.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettlementReport {
    pub steps: Vec<StepOutcome>,
}

impl SettlementReport {
    fn record(&mut self, step: SettlementStep, status: StepStatus, detail: impl Into<String>) {
        SIDE_EFFECTS_TOTAL
            .with_label_values(&[step.as_str(), status.as_str()])
            .inc();
        self.steps.push(StepOutcome {
            step,
            status,
            detail: detail.into(),
        });
    }

    pub fn status_of(&self, step: SettlementStep) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.status)
    }

    pub fn applied(&self, step: SettlementStep) -> bool {
        self.status_of(step) == Some(StepStatus::Applied)
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

/// Which side effects a status transition fires. Pure, so the exactly-once
/// gating is testable without a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectPlan {
    pub memberships: bool,
    pub wallet_debit: bool,
    pub incentives: bool,
    pub inventory: bool,
    pub dashboard_fold: bool,
}

impl EffectPlan {
    /// Plan for a freshly created bill.
    pub fn for_create(status: BillStatus) -> Self {
        let completed = status == BillStatus::Completed;
        Self {
            memberships: true,
            wallet_debit: true,
            incentives: completed,
            inventory: completed,
            dashboard_fold: completed,
        }
    }

    /// Plan for an update from `previous` to `new`.
    ///
    /// Inventory and incentives fire only on the transition into Completed.
    /// A bill already Completed still re-folds the dashboard on update,
    /// at the risk of double counting. Transitions into terminal
    /// states fire nothing (cancel/refund have their own endpoints).
    pub fn for_update(previous: BillStatus, new: BillStatus) -> Self {
        if new.is_terminal() {
            return Self {
                memberships: false,
                wallet_debit: false,
                incentives: false,
                inventory: false,
                dashboard_fold: false,
            };
        }
        let newly_completed = new == BillStatus::Completed && previous != BillStatus::Completed;
        let still_completed = new == BillStatus::Completed && previous == BillStatus::Completed;
        Self {
            memberships: true,
            wallet_debit: true,
            incentives: newly_completed,
            inventory: newly_completed,
            dashboard_fold: newly_completed || still_completed,
        }
    }
}

/// Line items and amounts a settlement pass actually operates on. For
/// creates these come from the bill; for updates the patch takes
/// precedence over stored lines for inventory/incentives, while
/// memberships and wallet debits fire only when the patch carries them.
struct SideEffectInputs<'a> {
    membership_lines: &'a [MembershipLine],
    wallet_amount: f64,
    services: &'a [ServiceLine],
    products: &'a [ProductLine],
}

#[derive(Clone)]
pub struct SettlementService {
    bills: BillRepository,
    ledger: LedgerService,
    inventory: InventoryService,
    memberships: MembershipService,
    dashboards: DashboardService,
    directory: DirectoryService,
}

impl SettlementService {
    pub fn new(
        bills: BillRepository,
        ledger: LedgerService,
        inventory: InventoryService,
        memberships: MembershipService,
        dashboards: DashboardService,
        directory: DirectoryService,
    ) -> Self {
        Self {
            bills,
            ledger,
            inventory,
            memberships,
            dashboards,
            directory,
        }
    }

    /// Create and settle a bill. Only the bill write itself can fail the
    /// call; side effects degrade into the report.
    #[instrument(skip(self, payload), fields(unit_id = %payload.unit_id, status = %payload.status))]
    pub async fn settle_bill(
        &self,
        payload: NewBill,
    ) -> Result<(Bill, SettlementReport), AppError> {
        payload.validate()?;

        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4(),
            transaction_id: BillRepository::new_transaction_id(),
            bill_number: self.bills.next_bill_number().await?,
            status: payload.status,
            client: payload.client,
            services: payload.services,
            products: payload.products,
            new_memberships: payload.new_memberships,
            payment: payload.payment,
            totals: payload.totals,
            applied_coupon_code: payload.applied_coupon_code,
            change_returned: payload.change_returned,
            unit_id: payload.unit_id,
            created_by: payload.created_by,
            cancellation_reason: None,
            cancelled_at: None,
            refund_amount: None,
            refund_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.bills.insert(&bill).await {
            SETTLEMENTS_TOTAL
                .with_label_values(&["create", "error"])
                .inc();
            return Err(err);
        }

        let plan = EffectPlan::for_create(bill.status);
        let inputs = SideEffectInputs {
            membership_lines: &bill.new_memberships,
            wallet_amount: bill.wallet_amount(),
            services: &bill.services,
            products: &bill.products,
        };
        let report = self.run_side_effects(&bill, plan, inputs).await;

        SETTLEMENTS_TOTAL.with_label_values(&["create", "ok"]).inc();
        info!(
            bill_number = %bill.bill_number,
            status = %bill.status,
            failures = report.has_failures(),
            "bill settled"
        );
        Ok((bill, report))
    }

    /// Apply a patch to a stored bill and re-evaluate side effects against
    /// the previous-vs-new status.
    #[instrument(skip(self, patch), fields(bill_id = %id))]
    pub async fn update_bill(
        &self,
        id: Uuid,
        patch: BillPatch,
    ) -> Result<(Bill, SettlementReport), AppError> {
        let mut bill = self.bills.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("bill {} not found", id))
        })?;
        let previous_status = bill.status;

        patch.apply_to(&mut bill);
        bill.updated_at = Utc::now();
        if let Err(err) = self.bills.replace(&bill).await {
            SETTLEMENTS_TOTAL
                .with_label_values(&["update", "error"])
                .inc();
            return Err(err);
        }

        let plan = EffectPlan::for_update(previous_status, bill.status);
        let empty_memberships: Vec<MembershipLine> = Vec::new();
        let inputs = SideEffectInputs {
            // Memberships and wallet debits re-fire only when the patch
            // itself carries them.
            membership_lines: patch
                .new_memberships
                .as_deref()
                .unwrap_or(&empty_memberships),
            wallet_amount: patch.wallet_amount(),
            services: patch.services.as_deref().unwrap_or(&bill.services),
            products: patch.products.as_deref().unwrap_or(&bill.products),
        };
        let report = self.run_side_effects(&bill, plan, inputs).await;

        SETTLEMENTS_TOTAL.with_label_values(&["update", "ok"]).inc();
        info!(
            bill_number = %bill.bill_number,
            previous_status = %previous_status,
            status = %bill.status,
            failures = report.has_failures(),
            "bill updated"
        );
        Ok((bill, report))
    }

    /// Flip a bill to cancelled. No settlement side effects fire.
    #[instrument(skip(self), fields(bill_id = %id))]
    pub async fn cancel_bill(&self, id: Uuid, reason: Option<String>) -> Result<Bill, AppError> {
        let mut bill = self.bills.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("bill {} not found", id))
        })?;
        bill.status = BillStatus::Cancelled;
        bill.cancellation_reason = reason;
        bill.cancelled_at = Some(mongodb::bson::DateTime::now());
        bill.updated_at = Utc::now();
        self.bills.replace(&bill).await?;
        info!(bill_number = %bill.bill_number, "bill cancelled");
        Ok(bill)
    }

    /// Flip a bill to refunded, recording amount and reason only.
    #[instrument(skip(self), fields(bill_id = %id))]
    pub async fn refund_bill(
        &self,
        id: Uuid,
        refund_amount: Option<f64>,
        reason: Option<String>,
    ) -> Result<Bill, AppError> {
        let mut bill = self.bills.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("bill {} not found", id))
        })?;
        bill.status = BillStatus::Refunded;
        bill.refund_amount = refund_amount;
        bill.refund_reason = reason;
        bill.refunded_at = Some(mongodb::bson::DateTime::now());
        bill.updated_at = Utc::now();
        self.bills.replace(&bill).await?;
        info!(bill_number = %bill.bill_number, "bill refunded");
        Ok(bill)
    }

    async fn run_side_effects(
        &self,
        bill: &Bill,
        plan: EffectPlan,
        inputs: SideEffectInputs<'_>,
    ) -> SettlementReport {
        let mut report = SettlementReport::default();

        if plan.memberships && !inputs.membership_lines.is_empty() {
            let result = self
                .memberships
                .provision(inputs.membership_lines, bill.client.id, bill.created_by)
                .await;
            if result.failures.is_empty() {
                report.record(
                    SettlementStep::Memberships,
                    StepStatus::Applied,
                    format!("{} membership lines provisioned", result.applied()),
                );
            } else {
                report.record(
                    SettlementStep::Memberships,
                    StepStatus::Failed,
                    format!(
                        "{} applied, {} failed: {}",
                        result.applied(),
                        result.failures.len(),
                        result.failures.join("; ")
                    ),
                );
            }
        } else {
            report.record(SettlementStep::Memberships, StepStatus::Skipped, "no membership lines");
        }

        if plan.wallet_debit && inputs.wallet_amount > 0.0 {
            match self
                .ledger
                .debit_wallet(
                    bill.client.id,
                    inputs.wallet_amount,
                    format!("Payment for bill: {}", bill.bill_number),
                    TxCategory::BillPayment,
                    TxReference::for_bill(bill.id, &bill.bill_number),
                    bill.created_by,
                )
                .await
            {
                Ok(tx) => report.record(
                    SettlementStep::WalletDebit,
                    StepStatus::Applied,
                    format!("debited {} ({})", tx.amount, tx.transaction_id),
                ),
                Err(err) => {
                    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                    warn!(bill_number = %bill.bill_number, error = %err, "wallet debit failed");
                    report.record(SettlementStep::WalletDebit, StepStatus::Failed, err.to_string());
                }
            }
        } else {
            report.record(SettlementStep::WalletDebit, StepStatus::Skipped, "no wallet payment");
        }

        let mut incentive_outcome: Option<IncentiveOutcome> = None;
        if plan.incentives && !inputs.services.is_empty() {
            let outcome = compute_incentives(inputs.services, &bill.bill_number);
            report.record(
                SettlementStep::Incentives,
                StepStatus::Applied,
                format!(
                    "{} incentives totaling {:.2}",
                    outcome.per_service.len(),
                    outcome.total
                ),
            );
            incentive_outcome = Some(outcome);
        } else {
            report.record(SettlementStep::Incentives, StepStatus::Skipped, "not newly completed");
        }

        if plan.inventory && !inputs.services.is_empty() {
            match self.inventory.reduce_for_services(inputs.services, bill).await {
                Ok(adjustment) => report.record(
                    SettlementStep::ServiceInventory,
                    StepStatus::Applied,
                    format!("{} inventory rows updated", adjustment.updated.len()),
                ),
                Err(err) => {
                    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                    warn!(bill_number = %bill.bill_number, error = %err, "service inventory reduction failed");
                    report.record(
                        SettlementStep::ServiceInventory,
                        StepStatus::Failed,
                        err.to_string(),
                    );
                }
            }
        } else {
            report.record(SettlementStep::ServiceInventory, StepStatus::Skipped, "not newly completed");
        }

        if plan.inventory && !inputs.products.is_empty() {
            match self.inventory.reduce_for_products(inputs.products, bill).await {
                Ok(adjustment) => report.record(
                    SettlementStep::ProductInventory,
                    StepStatus::Applied,
                    format!("{} inventory rows updated", adjustment.updated.len()),
                ),
                Err(err) => {
                    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                    warn!(bill_number = %bill.bill_number, error = %err, "product inventory reduction failed");
                    report.record(
                        SettlementStep::ProductInventory,
                        StepStatus::Failed,
                        err.to_string(),
                    );
                }
            }
        } else {
            report.record(SettlementStep::ProductInventory, StepStatus::Skipped, "not newly completed");
        }

        if plan.dashboard_fold {
            let staff_names = match self.directory.names_for(&bill.staff_ids()).await {
                Ok(names) => names,
                Err(err) => {
                    warn!(bill_number = %bill.bill_number, error = %err, "staff name lookup failed");
                    Default::default()
                }
            };
            match self
                .dashboards
                .fold_bill_for_today(bill, incentive_outcome.as_ref(), &staff_names)
                .await
            {
                Ok(dashboard) => report.record(
                    SettlementStep::DashboardFold,
                    StepStatus::Applied,
                    format!("dashboard {} now at {} bills", dashboard.date, dashboard.sales.total_bills),
                ),
                Err(err) => {
                    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                    warn!(bill_number = %bill.bill_number, error = %err, "dashboard fold failed");
                    report.record(SettlementStep::DashboardFold, StepStatus::Failed, err.to_string());
                }
            }
        } else {
            report.record(SettlementStep::DashboardFold, StepStatus::Skipped, "bill not completed");
        }

        if let Ok(json) = serde_json::to_string(&report) {
            tracing::debug!(bill_number = %bill.bill_number, report = %json, "side-effect chain finished");
        }
        report
    }
}
