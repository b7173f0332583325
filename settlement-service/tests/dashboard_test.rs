mod common;

use chrono::{Duration, Utc};
use settlement_service::models::{BillStatus, DailyDashboard};
use settlement_service::services::{compute_incentives, fold_bill};
use std::collections::HashMap;
use uuid::Uuid;

fn fold(
    dashboard: &mut DailyDashboard,
    bill: &settlement_service::models::Bill,
    incentives: Option<&settlement_service::models::IncentiveOutcome>,
) {
    let names: HashMap<Uuid, String> = HashMap::new();
    fold_bill(
        dashboard,
        bill,
        incentives,
        &names,
        Duration::hours(24),
        Utc::now(),
    );
}

#[test]
fn folding_a_bill_updates_sales_and_averages() {
    common::init_tracing();
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let bill_a = common::bill(
        BillStatus::Completed,
        vec![common::service_line(1000.0, 0.0, None)],
        1000.0,
    );
    let bill_b = common::bill(
        BillStatus::Completed,
        vec![common::service_line(500.0, 0.0, None)],
        500.0,
    );

    fold(&mut dashboard, &bill_a, None);
    fold(&mut dashboard, &bill_b, None);

    assert_eq!(dashboard.sales.total_bills, 2);
    assert_eq!(dashboard.sales.total_revenue, 1500.0);
    assert_eq!(dashboard.sales.services.count, 2);
    assert_eq!(dashboard.avg_bill_value, 750.0);
    assert_eq!(dashboard.bills.completed, 2);
    assert_eq!(dashboard.net_profit, 1500.0);
}

#[test]
fn cash_is_counted_net_of_change_returned() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let mut bill = common::bill(BillStatus::Completed, vec![], 450.0);
    bill.payment = common::payment(500.0, 0.0, 500.0);
    bill.change_returned = 50.0;

    fold(&mut dashboard, &bill, None);

    assert_eq!(dashboard.payments.cash, 450.0);
    assert_eq!(dashboard.payments.change_returned, 50.0);
    assert_eq!(dashboard.payments.total_collected, 450.0);
}

#[test]
fn each_client_is_classified_once_per_day() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let bill = common::bill(BillStatus::Completed, vec![], 300.0);
    let mut second_visit = common::bill(BillStatus::Completed, vec![], 200.0);
    second_visit.client = bill.client.clone();

    fold(&mut dashboard, &bill, None);
    fold(&mut dashboard, &second_visit, None);

    // Two bills, one client: the classification only counted once.
    assert_eq!(dashboard.sales.total_bills, 2);
    assert_eq!(dashboard.clients.total_clients, 1);
    assert_eq!(dashboard.seen_client_ids.len(), 1);
    assert_eq!(
        dashboard.clients.new_clients + dashboard.clients.returning_clients,
        1
    );
}

#[test]
fn clients_created_within_the_window_count_as_new() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());

    let mut fresh = common::bill(BillStatus::Completed, vec![], 100.0);
    fresh.client = common::client(0);
    let mut old = common::bill(BillStatus::Completed, vec![], 100.0);
    old.client = common::client(400);

    fold(&mut dashboard, &fresh, None);
    fold(&mut dashboard, &old, None);

    assert_eq!(dashboard.clients.new_clients, 1);
    assert_eq!(dashboard.clients.returning_clients, 1);
    assert_eq!(dashboard.clients.total_clients, 2);
}

#[test]
fn top_services_are_ranked_by_revenue_and_truncated() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());

    // Twelve distinct services with increasing revenue.
    for i in 1..=12 {
        let line = common::service_line(i as f64 * 100.0, 0.0, None);
        let bill = common::bill(BillStatus::Completed, vec![line], i as f64 * 100.0);
        fold(&mut dashboard, &bill, None);
    }

    assert_eq!(dashboard.top_services.len(), 10);
    assert_eq!(dashboard.top_services[0].revenue, 1200.0);
    assert!(dashboard
        .top_services
        .windows(2)
        .all(|w| w[0].revenue >= w[1].revenue));
    // The two cheapest services fell off the list.
    assert!(dashboard.top_services.iter().all(|t| t.revenue >= 300.0));
}

#[test]
fn repeat_sales_of_one_service_accumulate_in_top_list() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let line = common::service_line(250.0, 0.0, None);

    let bill_a = common::bill(BillStatus::Completed, vec![line.clone()], 250.0);
    let bill_b = common::bill(BillStatus::Completed, vec![line], 250.0);
    fold(&mut dashboard, &bill_a, None);
    fold(&mut dashboard, &bill_b, None);

    assert_eq!(dashboard.top_services.len(), 1);
    assert_eq!(dashboard.top_services[0].count, 2);
    assert_eq!(dashboard.top_services[0].revenue, 500.0);
}

#[test]
fn incentives_fold_into_expenses_and_staff_rows() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let staff_id = Uuid::new_v4();
    let services = vec![common::service_line(1000.0, 10.0, Some(staff_id))];
    let bill = common::bill(BillStatus::Completed, services, 1000.0);

    let outcome = compute_incentives(&bill.services, &bill.bill_number);
    fold(&mut dashboard, &bill, Some(&outcome));

    assert_eq!(dashboard.expenses.incentives, 100.0);
    assert_eq!(dashboard.expenses.total_expenses, 100.0);
    assert_eq!(dashboard.net_profit, 900.0);

    let row = dashboard
        .staff_performance
        .iter()
        .find(|s| s.staff_id == staff_id)
        .expect("staff row created");
    assert_eq!(row.incentives_earned, 100.0);
    assert_eq!(row.bills_handled, 1);
    assert_eq!(row.total_sales, 1000.0);
}

#[test]
fn pending_bills_count_in_their_own_status_bucket() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let bill = common::bill(BillStatus::Pending, vec![], 100.0);
    fold(&mut dashboard, &bill, None);

    assert_eq!(dashboard.bills.pending, 1);
    assert_eq!(dashboard.bills.completed, 0);
}

#[test]
fn coupon_usage_and_discounts_accumulate() {
    let mut dashboard = DailyDashboard::new(20260807, Uuid::new_v4());
    let mut bill = common::bill(BillStatus::Completed, vec![], 900.0);
    bill.totals.total_discount = 100.0;
    bill.totals.coupon_discount = 60.0;
    bill.applied_coupon_code = Some("WELCOME10".to_string());

    fold(&mut dashboard, &bill, None);

    assert_eq!(dashboard.discounts.total_discount_given, 100.0);
    assert_eq!(dashboard.discounts.coupon_discount, 60.0);
    assert_eq!(dashboard.discounts.total_coupons_used, 1);
}
