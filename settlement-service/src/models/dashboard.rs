//! Daily sales dashboard: a per-unit, per-day denormalized rollup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategorySales {
    pub count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sales {
    pub total_bills: u64,
    pub total_revenue: f64,
    #[serde(default)]
    pub services: CategorySales,
    #[serde(default)]
    pub products: CategorySales,
    #[serde(default)]
    pub memberships: CategorySales,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payments {
    /// Cash kept in the drawer: tendered cash net of change returned.
    pub cash: f64,
    pub card: f64,
    pub upi: f64,
    pub wallet: f64,
    pub total_collected: f64,
    pub change_returned: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Discounts {
    pub total_discount_given: f64,
    pub coupon_discount: f64,
    pub membership_discount: f64,
    pub total_coupons_used: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clients {
    pub total_clients: u64,
    pub new_clients: u64,
    pub returning_clients: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillCounts {
    pub completed: u64,
    pub pending: u64,
    pub cancelled: u64,
    pub refunded: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expenses {
    pub rent: f64,
    pub electricity: f64,
    pub incentives: f64,
    pub other: f64,
    pub total_expenses: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopService {
    pub service_id: Uuid,
    pub service_name: String,
    pub count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffPerformance {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub total_sales: f64,
    pub bills_handled: u64,
    pub incentives_earned: f64,
}

/// Uniquely keyed by (date, unit_id); folded incrementally as bills settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDashboard {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Business date as a YYYYMMDD number.
    pub date: i64,
    pub unit_id: Uuid,
    #[serde(default)]
    pub sales: Sales,
    #[serde(default)]
    pub payments: Payments,
    #[serde(default)]
    pub discounts: Discounts,
    #[serde(default)]
    pub clients: Clients,
    /// Clients already counted today. Persisted so restarts and replicas do
    /// not re-count a client.
    #[serde(default)]
    pub seen_client_ids: Vec<Uuid>,
    #[serde(default)]
    pub bills: BillCounts,
    #[serde(default)]
    pub expenses: Expenses,
    #[serde(default)]
    pub avg_bill_value: f64,
    #[serde(default)]
    pub net_profit: f64,
    /// Top 10 services by cumulative revenue.
    #[serde(default)]
    pub top_services: Vec<TopService>,
    #[serde(default)]
    pub top_products: Vec<TopProduct>,
    #[serde(default)]
    pub staff_performance: Vec<StaffPerformance>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl DailyDashboard {
    /// Fresh zeroed dashboard for a (date, unit) key.
    pub fn new(date: i64, unit_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            date,
            unit_id,
            sales: Sales::default(),
            payments: Payments::default(),
            discounts: Discounts::default(),
            clients: Clients::default(),
            seen_client_ids: Vec::new(),
            bills: BillCounts::default(),
            expenses: Expenses::default(),
            avg_bill_value: 0.0,
            net_profit: 0.0,
            top_services: Vec::new(),
            top_products: Vec::new(),
            staff_performance: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
