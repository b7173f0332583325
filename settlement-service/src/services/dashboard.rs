//! Daily sales dashboard: fold settled bills into a per-unit, per-day
//! rollup document.
//!
//! The fold itself is pure and in-place. The store wraps it in a per-key
//! async mutex so two settlements for the same (date, unit) cannot lose
//! each other's read-modify-write.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReplaceOptions},
    Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Bill, DailyDashboard, IncentiveOutcome, StaffPerformance, TopProduct, TopService,
};
use crate::services::incentives::date_number;
use crate::services::metrics::DB_QUERY_DURATION;

const TOP_LIST_SIZE: usize = 10;

/// Fold one settled bill into the dashboard, in place.
///
/// `staff_names` resolves ids for the staff performance list; unresolved
/// staff keep a placeholder name. `new_client_window` decides the
/// new-vs-returning split against the client record's creation time.
pub fn fold_bill(
    dashboard: &mut DailyDashboard,
    bill: &Bill,
    incentives: Option<&IncentiveOutcome>,
    staff_names: &HashMap<Uuid, String>,
    new_client_window: Duration,
    now: DateTime<Utc>,
) {
    dashboard.sales.total_bills += 1;
    dashboard.sales.total_revenue += bill.totals.final_amount;

    fold_client(dashboard, bill, new_client_window, now);

    if !bill.services.is_empty() {
        dashboard.sales.services.count += bill.services.len() as u64;
        let revenue: f64 = bill.services.iter().map(|s| s.pricing.total_price).sum();
        dashboard.sales.services.revenue += revenue;
        fold_top_services(dashboard, bill);
    }

    if !bill.products.is_empty() {
        dashboard.sales.products.count += bill.products.len() as u64;
        let revenue: f64 = bill.products.iter().map(|p| p.pricing.total_price).sum();
        dashboard.sales.products.revenue += revenue;
        fold_top_products(dashboard, bill);
    }

    if !bill.new_memberships.is_empty() {
        dashboard.sales.memberships.count += bill.new_memberships.len() as u64;
        let revenue: f64 = bill
            .new_memberships
            .iter()
            .map(|m| m.pricing.final_price)
            .sum();
        dashboard.sales.memberships.revenue += revenue;
    }

    // Cash kept in the drawer is tendered cash minus change handed back.
    let cash_received = bill.payment.methods.cash - bill.change_returned;
    dashboard.payments.cash += cash_received;
    dashboard.payments.card += bill.payment.methods.card;
    dashboard.payments.upi += bill.payment.methods.upi;
    dashboard.payments.wallet += bill.payment.methods.wallet;
    dashboard.payments.change_returned += bill.change_returned;
    dashboard.payments.total_collected += bill.payment.total_paid - bill.change_returned;

    dashboard.discounts.total_discount_given += bill.totals.total_discount;
    dashboard.discounts.coupon_discount += bill.totals.coupon_discount;
    if bill.applied_coupon_code.is_some() {
        dashboard.discounts.total_coupons_used += 1;
    }

    match bill.status {
        crate::models::BillStatus::Completed => dashboard.bills.completed += 1,
        crate::models::BillStatus::Pending => dashboard.bills.pending += 1,
        crate::models::BillStatus::Cancelled => dashboard.bills.cancelled += 1,
        crate::models::BillStatus::Refunded => dashboard.bills.refunded += 1,
    }

    if dashboard.sales.total_bills > 0 {
        dashboard.avg_bill_value =
            dashboard.sales.total_revenue / dashboard.sales.total_bills as f64;
    }

    fold_staff_performance(dashboard, bill, staff_names);

    if let Some(incentives) = incentives {
        fold_incentives(dashboard, incentives, staff_names);
    }

    dashboard.expenses.total_expenses = dashboard.expenses.rent
        + dashboard.expenses.electricity
        + dashboard.expenses.incentives
        + dashboard.expenses.other;
    dashboard.net_profit = dashboard.sales.total_revenue - dashboard.expenses.total_expenses;
    dashboard.updated_at = now;
}

fn fold_client(
    dashboard: &mut DailyDashboard,
    bill: &Bill,
    new_client_window: Duration,
    now: DateTime<Utc>,
) {
    let client_id = bill.client.id;
    if dashboard.seen_client_ids.contains(&client_id) {
        return;
    }
    dashboard.clients.total_clients += 1;
    dashboard.seen_client_ids.push(client_id);

    let is_new = bill
        .client
        .created_at
        .map(|created| now - created.to_chrono() <= new_client_window)
        .unwrap_or(false);
    if is_new {
        dashboard.clients.new_clients += 1;
    } else {
        dashboard.clients.returning_clients += 1;
    }
}

fn fold_top_services(dashboard: &mut DailyDashboard, bill: &Bill) {
    for line in &bill.services {
        let id = match line.id {
            Some(id) => id,
            None => continue,
        };
        if let Some(existing) = dashboard.top_services.iter_mut().find(|t| t.service_id == id) {
            existing.count += line.quantity as u64;
            existing.revenue += line.pricing.total_price;
        } else {
            dashboard.top_services.push(TopService {
                service_id: id,
                service_name: line.name.clone(),
                count: line.quantity as u64,
                revenue: line.pricing.total_price,
            });
        }
    }
    dashboard
        .top_services
        .sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(std::cmp::Ordering::Equal));
    dashboard.top_services.truncate(TOP_LIST_SIZE);
}

fn fold_top_products(dashboard: &mut DailyDashboard, bill: &Bill) {
    for line in &bill.products {
        let id = match line.id {
            Some(id) => id,
            None => continue,
        };
        if let Some(existing) = dashboard.top_products.iter_mut().find(|t| t.product_id == id) {
            existing.count += line.quantity as u64;
            existing.revenue += line.pricing.total_price;
        } else {
            dashboard.top_products.push(TopProduct {
                product_id: id,
                product_name: line.name.clone(),
                count: line.quantity as u64,
                revenue: line.pricing.total_price,
            });
        }
    }
    dashboard
        .top_products
        .sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(std::cmp::Ordering::Equal));
    dashboard.top_products.truncate(TOP_LIST_SIZE);
}

fn staff_name(staff_names: &HashMap<Uuid, String>, id: Uuid) -> String {
    staff_names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}

fn fold_staff_performance(
    dashboard: &mut DailyDashboard,
    bill: &Bill,
    staff_names: &HashMap<Uuid, String>,
) {
    for staff_id in bill.staff_ids() {
        if let Some(existing) = dashboard
            .staff_performance
            .iter_mut()
            .find(|s| s.staff_id == staff_id)
        {
            existing.total_sales += bill.totals.final_amount;
            existing.bills_handled += 1;
        } else {
            dashboard.staff_performance.push(StaffPerformance {
                staff_id,
                staff_name: staff_name(staff_names, staff_id),
                total_sales: bill.totals.final_amount,
                bills_handled: 1,
                incentives_earned: 0.0,
            });
        }
    }
}

fn fold_incentives(
    dashboard: &mut DailyDashboard,
    incentives: &IncentiveOutcome,
    staff_names: &HashMap<Uuid, String>,
) {
    dashboard.expenses.incentives += incentives.total;

    for incentive in &incentives.per_service {
        if let Some(existing) = dashboard
            .staff_performance
            .iter_mut()
            .find(|s| s.staff_id == incentive.staff_id)
        {
            existing.incentives_earned += incentive.amount;
        } else {
            dashboard.staff_performance.push(StaffPerformance {
                staff_id: incentive.staff_id,
                staff_name: staff_name(staff_names, incentive.staff_id),
                total_sales: 0.0,
                bills_handled: 0,
                incentives_earned: incentive.amount,
            });
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    dashboards: Collection<DailyDashboard>,
    locks: Arc<DashMap<(i64, Uuid), Arc<Mutex<()>>>>,
    timezone_offset_minutes: i64,
    new_client_window: Duration,
}

impl DashboardService {
    pub fn new(db: &Database, timezone_offset_minutes: i64, new_client_window_hours: i64) -> Self {
        Self {
            dashboards: db.collection("daily_dashboards"),
            locks: Arc::new(DashMap::new()),
            timezone_offset_minutes,
            new_client_window: Duration::hours(new_client_window_hours),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let key_idx = IndexModel::builder()
            .keys(doc! { "date": 1, "unit_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("daily_dashboard_key_idx".to_string())
                    .build(),
            )
            .build();
        self.dashboards.create_indexes([key_idx], None).await?;
        info!("Dashboard indexes initialized");
        Ok(())
    }

    /// Fold a bill into today's dashboard for its unit, creating the
    /// dashboard on first use. Serialized per (date, unit) key.
    #[instrument(skip(self, bill, incentives, staff_names), fields(bill_number = %bill.bill_number, unit_id = %bill.unit_id))]
    pub async fn fold_bill_for_today(
        &self,
        bill: &Bill,
        incentives: Option<&IncentiveOutcome>,
        staff_names: &HashMap<Uuid, String>,
    ) -> Result<DailyDashboard, AppError> {
        let now = Utc::now();
        let date = date_number(now, self.timezone_offset_minutes);
        let key = (date, bill.unit_id);

        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["fold_dashboard"])
            .start_timer();

        let mut dashboard = self
            .dashboards
            .find_one(
                doc! { "date": date, "unit_id": bill.unit_id.to_string() },
                None,
            )
            .await?
            .unwrap_or_else(|| DailyDashboard::new(date, bill.unit_id));

        fold_bill(
            &mut dashboard,
            bill,
            incentives,
            staff_names,
            self.new_client_window,
            now,
        );

        self.dashboards
            .replace_one(
                doc! { "_id": dashboard.id.to_string() },
                &dashboard,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;

        timer.observe_duration();
        info!(
            date = date,
            unit_id = %bill.unit_id,
            total_bills = dashboard.sales.total_bills,
            "dashboard updated"
        );
        Ok(dashboard)
    }
}
