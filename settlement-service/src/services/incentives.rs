//! Staff incentive computation.
//!
//! Settlement-time computation produces raw per-service amounts; payability
//! is decided by the daily aggregation, which gates each staff member's
//! incentive on a salary-derived daily target.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use mongodb::{
    bson::{doc, to_bson},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use service_core::error::AppError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Account, BillRef, DailyTargetIncentive, EntryKind, IncentiveDashboard, IncentiveOutcome,
    IncentiveProgram, IncentiveSummary, ProgramSnapshot, ProgramStatus, ServiceIncentive,
    ServiceLine, Staff, StaffIncentiveSummary,
};
use crate::models::Bill;
use crate::services::ledger::{AccountEntryContext, LedgerService};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::{BillRepository, DirectoryService};

/// Payroll convention: monthly salary spreads over 26 working days.
pub const WORKING_DAYS_PER_MONTH: f64 = 26.0;

/// Compute raw incentive facts for a bill's service lines.
///
/// Lines without a staff assignment or with a non-positive percentage carry
/// no incentive. Amounts are left unrounded here; rounding happens when the
/// daily aggregation folds them in.
pub fn compute_incentives(services: &[ServiceLine], bill_number: &str) -> IncentiveOutcome {
    let mut outcome = IncentiveOutcome::default();
    for line in services {
        let staff_id = match line.staff_id {
            Some(id) if line.incentive_pct > 0.0 => id,
            _ => continue,
        };
        let amount = line.pricing.final_price * line.incentive_pct / 100.0;
        outcome.total += amount;
        outcome.per_service.push(ServiceIncentive {
            service_id: line.id,
            service_name: line.name.clone(),
            staff_id,
            final_price: line.pricing.final_price,
            incentive_pct: line.incentive_pct,
            amount,
            quantity: line.quantity,
        });
    }
    debug!(
        bill_number = bill_number,
        incentives = outcome.per_service.len(),
        total = outcome.total,
        "incentives computed"
    );
    outcome
}

/// Start and end instants of the business day containing `instant`, under a
/// fixed minute offset from UTC.
pub fn business_day_bounds(
    instant: DateTime<Utc>,
    offset_minutes: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let shifted = instant + Duration::minutes(offset_minutes);
    let start_naive = shifted.date_naive().and_time(NaiveTime::MIN);
    let start = DateTime::<Utc>::from_naive_utc_and_offset(start_naive, Utc);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Business date of `instant` as a YYYYMMDD number.
pub fn date_number(instant: DateTime<Utc>, offset_minutes: i64) -> i64 {
    let shifted = (instant + Duration::minutes(offset_minutes)).date_naive();
    (shifted.year() as i64) * 10_000 + (shifted.month() as i64) * 100 + shifted.day() as i64
}

/// Per-staff daily rollup over the day's bills, with the target gate.
pub fn build_staff_summaries(
    bills: &[Bill],
    staff: &[Staff],
    program: &DailyTargetIncentive,
) -> Vec<StaffIncentiveSummary> {
    staff
        .iter()
        .map(|member| {
            let mut total_service_value = 0.0;
            let mut total_incentive_amount = 0.0;
            let mut service_count: u32 = 0;

            for bill in bills {
                for line in &bill.services {
                    if line.staff_id != Some(member.id) {
                        continue;
                    }
                    let service_value = line.pricing.final_price;
                    let incentive_amount = if line.incentive_pct > 0.0 {
                        (service_value * line.incentive_pct / 100.0).round()
                    } else {
                        0.0
                    };
                    total_service_value += service_value;
                    total_incentive_amount += incentive_amount;
                    service_count += 1;
                }
            }

            let daily_salary_raw = member.salary / WORKING_DAYS_PER_MONTH;
            let daily_salary = if member.salary > 0.0 {
                daily_salary_raw.round()
            } else {
                0.0
            };
            let daily_target = if member.salary > 0.0 && program.target_value > 0.0 {
                (daily_salary_raw * program.target_value).round()
            } else {
                0.0
            };

            let target_achieved = daily_target > 0.0 && total_service_value >= daily_target;
            let final_incentive_amount = if target_achieved {
                total_incentive_amount
            } else {
                0.0
            };
            let target_percentage = if daily_target > 0.0 {
                (total_service_value / daily_target * 100.0).round()
            } else {
                0.0
            };

            StaffIncentiveSummary {
                staff_id: member.id,
                staff_name: member.name.clone(),
                salary: member.salary,
                daily_salary,
                daily_target,
                total_service_value,
                total_incentive_amount: final_incentive_amount,
                service_count,
                target_achieved,
                target_percentage,
                incentive_eligible: target_achieved,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct IncentiveService {
    programs: Collection<IncentiveProgram>,
    dashboards: Collection<IncentiveDashboard>,
    bills: BillRepository,
    directory: DirectoryService,
    ledger: LedgerService,
    timezone_offset_minutes: i64,
}

impl IncentiveService {
    pub fn new(
        db: &Database,
        bills: BillRepository,
        directory: DirectoryService,
        ledger: LedgerService,
        timezone_offset_minutes: i64,
    ) -> Self {
        Self {
            programs: db.collection("incentive_programs"),
            dashboards: db.collection("incentive_dashboards"),
            bills,
            directory,
            ledger,
            timezone_offset_minutes,
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let key_idx = IndexModel::builder()
            .keys(doc! { "business_date": 1, "unit_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("incentive_dashboard_key_idx".to_string())
                    .build(),
            )
            .build();
        self.dashboards.create_indexes([key_idx], None).await?;

        let program_idx = IndexModel::builder()
            .keys(doc! { "unit_ids": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("incentive_program_unit_idx".to_string())
                    .build(),
            )
            .build();
        self.programs.create_indexes([program_idx], None).await?;

        info!("Incentive indexes initialized");
        Ok(())
    }

    /// Active incentive program covering a unit.
    async fn active_program_for_unit(&self, unit_id: Uuid) -> Result<IncentiveProgram, AppError> {
        let program = self
            .programs
            .find_one(
                doc! {
                    "unit_ids": unit_id.to_string(),
                    "status": "active",
                },
                None,
            )
            .await?;
        program.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "no active incentive program found for unit {}",
                unit_id
            ))
        })
    }

    /// Recalculate the incentive dashboard for one unit and business date.
    ///
    /// Pulls every non-cancelled, non-refunded bill inside the day window,
    /// rolls up each staff member against the program target, and upserts
    /// one dashboard per (business_date, unit): recalculation overwrites the
    /// bills, staff and summary sections.
    #[instrument(skip(self), fields(unit_id = %unit_id))]
    pub async fn calculate_daily(
        &self,
        unit_id: Uuid,
        business_date: DateTime<Utc>,
        calculated_by: Uuid,
    ) -> Result<IncentiveDashboard, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["calculate_daily_incentive"])
            .start_timer();

        let program = self.active_program_for_unit(unit_id).await?;
        let target = program.daily_target_incentive;

        let (day_start, day_end) = business_day_bounds(business_date, self.timezone_offset_minutes);
        let bills = self
            .bills
            .find_for_business_day(unit_id, day_start, day_end)
            .await?;
        info!(
            unit_id = %unit_id,
            bills = bills.len(),
            "bills loaded for incentive calculation"
        );

        let mut staff_ids: Vec<Uuid> = Vec::new();
        for bill in &bills {
            for line in &bill.services {
                if let Some(id) = line.staff_id {
                    if !staff_ids.contains(&id) {
                        staff_ids.push(id);
                    }
                }
            }
        }
        let staff = self.directory.find_staff_in_unit(&staff_ids, unit_id).await?;

        let staff_members = build_staff_summaries(&bills, &staff, &target);

        let bill_refs: Vec<BillRef> = bills
            .iter()
            .map(|bill| BillRef {
                bill_id: bill.id,
                bill_number: bill.bill_number.clone(),
                transaction_id: bill.transaction_id.clone(),
                timestamp: bill.created_at.timestamp_millis(),
                final_amount: bill.totals.final_amount,
                service_count: bill.services.len() as u32,
                client_id: Some(bill.client.id),
                status: bill.status,
            })
            .collect();

        let summary = IncentiveSummary {
            total_bills: bills.len() as u32,
            total_revenue: bills.iter().map(|b| b.totals.final_amount).sum(),
            unique_staff: staff_members.len() as u32,
            total_services: bills.iter().map(|b| b.services.len() as u32).sum(),
            total_incentive_given: staff_members
                .iter()
                .map(|s| s.total_incentive_amount)
                .sum(),
            staff_with_target_achieved: staff_members
                .iter()
                .filter(|s| s.target_achieved)
                .count() as u32,
            staff_without_target_achieved: staff_members
                .iter()
                .filter(|s| !s.target_achieved)
                .count() as u32,
        };

        let snapshot = ProgramSnapshot {
            program_id: program.id,
            daily_target_incentive: target,
            status: ProgramStatus::Active,
        };

        let business_date_number = date_number(business_date, self.timezone_offset_minutes);
        let now = Utc::now();

        let set = doc! {
            "bills": to_bson(&bill_refs).map_err(|e| AppError::InternalError(e.into()))?,
            "program": to_bson(&snapshot).map_err(|e| AppError::InternalError(e.into()))?,
            "staff_members": to_bson(&staff_members).map_err(|e| AppError::InternalError(e.into()))?,
            "summary": to_bson(&summary).map_err(|e| AppError::InternalError(e.into()))?,
            "status": "calculated",
            "calculated_by": calculated_by.to_string(),
            "calculated_at": mongodb::bson::DateTime::from_chrono(now),
        };
        let dashboard = self
            .dashboards
            .find_one_and_update(
                doc! {
                    "business_date": business_date_number,
                    "unit_id": unit_id.to_string(),
                },
                doc! {
                    "$set": set,
                    "$setOnInsert": {
                        "_id": Uuid::new_v4().to_string(),
                        "created_by": calculated_by.to_string(),
                    },
                },
                FindOneAndUpdateOptions::builder()
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("dashboard upsert returned no document"))
            })?;

        timer.observe_duration();
        info!(
            unit_id = %unit_id,
            business_date = business_date_number,
            staff = dashboard.staff_members.len(),
            total_incentive = dashboard.summary.total_incentive_given,
            "incentive dashboard calculated"
        );
        Ok(dashboard)
    }

    /// Pay out one staff member's incentive from a calculated dashboard by
    /// crediting their ledger account. A missing account, an unmet target,
    /// or a zero amount all skip the payout.
    #[instrument(skip(self), fields(dashboard_id = %dashboard_id, staff_id = %staff_id))]
    pub async fn pay_staff_incentive(
        &self,
        dashboard_id: Uuid,
        staff_id: Uuid,
        created_by: Uuid,
    ) -> Result<Option<crate::models::AccountTransaction>, AppError> {
        let dashboard = self
            .dashboards
            .find_one(doc! { "_id": dashboard_id.to_string() }, None)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "incentive dashboard {} not found",
                    dashboard_id
                ))
            })?;

        let member = dashboard
            .staff_members
            .iter()
            .find(|m| m.staff_id == staff_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "staff {} not on incentive dashboard {}",
                    staff_id,
                    dashboard_id
                ))
            })?;

        if !member.target_achieved || member.total_incentive_amount <= 0.0 {
            info!(staff_id = %staff_id, "no payable incentive, skipping payout");
            return Ok(None);
        }

        let account: Option<Account> = self.ledger.find_account_by_user(staff_id).await?;
        let account = match account {
            Some(account) => account,
            None => {
                warn!(staff_id = %staff_id, "no account found for staff, skipping payout");
                return Ok(None);
            }
        };

        let ctx = AccountEntryContext {
            description: format!(
                "Incentive payment: daily target incentive for {}",
                dashboard.business_date
            ),
            reference_type: Some("incentive".to_string()),
            reference_id: Some(dashboard.id),
            payment_method: Some("incentive".to_string()),
            unit_id: Some(dashboard.unit_id),
            created_by,
            notes: Some(format!("Incentive payment reference: {}", dashboard.id)),
        };
        self.ledger
            .apply_account_entry(
                account.id,
                EntryKind::Credit,
                member.total_incentive_amount,
                ctx,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_follow_the_offset() {
        // 20:00 UTC is already the next day at +330 minutes.
        let instant = Utc.with_ymd_and_hms(2026, 8, 6, 20, 0, 0).unwrap();
        let (start, end) = business_day_bounds(instant, 330);
        assert_eq!(start.date_naive().to_string(), "2026-08-07");
        assert_eq!(end - start, Duration::days(1) - Duration::milliseconds(1));
        assert_eq!(date_number(instant, 330), 20260807);

        // Without an offset the same instant stays on its UTC day.
        assert_eq!(date_number(instant, 0), 20260806);
    }
}
