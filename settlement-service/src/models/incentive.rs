//! Incentive program configuration and the per-day incentive dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::bill::BillStatus;

/// Daily target configuration: the target is a multiple of daily salary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DailyTargetIncentive {
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub max_incentive: f64,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncentiveProgram {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub daily_target_incentive: DailyTargetIncentive,
    pub status: ProgramStatus,
    #[serde(default)]
    pub unit_ids: Vec<Uuid>,
    pub created_by: Option<Uuid>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Program snapshot embedded in a dashboard at calculation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub program_id: Uuid,
    pub daily_target_incentive: DailyTargetIncentive,
    pub status: ProgramStatus,
}

/// Lightweight bill reference kept on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillRef {
    pub bill_id: Uuid,
    pub bill_number: String,
    pub transaction_id: String,
    /// Bill creation instant in epoch milliseconds.
    pub timestamp: i64,
    pub final_amount: f64,
    pub service_count: u32,
    pub client_id: Option<Uuid>,
    pub status: BillStatus,
}

/// Per-staff daily rollup with the target-achievement gate applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffIncentiveSummary {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub salary: f64,
    pub daily_salary: f64,
    pub daily_target: f64,
    pub total_service_value: f64,
    /// Zero when the daily target was not achieved.
    pub total_incentive_amount: f64,
    pub service_count: u32,
    pub target_achieved: bool,
    pub target_percentage: f64,
    pub incentive_eligible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncentiveSummary {
    pub total_bills: u32,
    pub total_revenue: f64,
    pub unique_staff: u32,
    pub total_services: u32,
    pub total_incentive_given: f64,
    pub staff_with_target_achieved: u32,
    pub staff_without_target_achieved: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardStatus {
    Draft,
    Calculated,
    Approved,
    Finalized,
}

/// One dashboard per (business date, unit). Recalculation overwrites the
/// bills, staff and summary sections wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncentiveDashboard {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Business date as a YYYYMMDD number.
    pub business_date: i64,
    pub unit_id: Uuid,
    #[serde(default)]
    pub bills: Vec<BillRef>,
    pub program: ProgramSnapshot,
    #[serde(default)]
    pub staff_members: Vec<StaffIncentiveSummary>,
    #[serde(default)]
    pub summary: IncentiveSummary,
    pub status: DashboardStatus,
    pub created_by: Uuid,
    pub calculated_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub calculated_at: DateTime<Utc>,
}

/// Per-service incentive fact computed at settlement time. Transient:
/// payability is decided later by the daily aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceIncentive {
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub staff_id: Uuid,
    pub final_price: f64,
    pub incentive_pct: f64,
    pub amount: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IncentiveOutcome {
    pub per_service: Vec<ServiceIncentive>,
    pub total: f64,
}
