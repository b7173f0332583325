mod common;

use chrono::{TimeZone, Utc};
use settlement_service::models::{BillStatus, DailyTargetIncentive};
use settlement_service::services::{
    build_staff_summaries, business_day_bounds, compute_incentives, date_number,
};
use uuid::Uuid;

#[test]
fn lines_without_staff_or_percentage_carry_no_incentive() {
    common::init_tracing();
    let staff = Uuid::new_v4();
    let services = vec![
        common::service_line(1000.0, 10.0, Some(staff)),
        common::service_line(500.0, 0.0, Some(staff)),
        common::service_line(800.0, 15.0, None),
    ];
    let outcome = compute_incentives(&services, "BILL-2026-1");
    assert_eq!(outcome.per_service.len(), 1);
    assert_eq!(outcome.total, 100.0);
    assert_eq!(outcome.per_service[0].staff_id, staff);
}

#[test]
fn settlement_time_amounts_are_unrounded() {
    let services = vec![common::service_line(333.0, 7.5, Some(Uuid::new_v4()))];
    let outcome = compute_incentives(&services, "BILL-2026-2");
    assert!((outcome.total - 24.975).abs() < 1e-9);
}

#[test]
fn daily_target_gate_awards_incentive_when_met() {
    // Salary 26000 => daily salary 1000; target 0.5 => 500. One service of
    // 1000 at 10% => raw incentive 100, and 1000 >= 500 achieves the target.
    let member = common::staff("S1", 26_000.0);
    let services = vec![common::service_line(1000.0, 10.0, Some(member.id))];
    let bill = common::bill(BillStatus::Completed, services, 1000.0);

    let program = DailyTargetIncentive {
        target_value: 0.5,
        max_incentive: 0.0,
        enabled: true,
    };
    let summaries = build_staff_summaries(std::slice::from_ref(&bill), &[member], &program);

    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s.daily_salary, 1000.0);
    assert_eq!(s.daily_target, 500.0);
    assert_eq!(s.total_service_value, 1000.0);
    assert!(s.target_achieved);
    assert!(s.incentive_eligible);
    assert_eq!(s.total_incentive_amount, 100.0);
    assert_eq!(s.target_percentage, 200.0);
}

#[test]
fn below_target_staff_get_zero_despite_raw_amounts() {
    // Daily target 1000, but only 600 of service value was delivered.
    let member = common::staff("S2", 26_000.0);
    let services = vec![common::service_line(600.0, 10.0, Some(member.id))];
    let bill = common::bill(BillStatus::Completed, services, 600.0);

    let program = DailyTargetIncentive {
        target_value: 1.0,
        max_incentive: 0.0,
        enabled: true,
    };
    let summaries = build_staff_summaries(std::slice::from_ref(&bill), &[member], &program);

    let s = &summaries[0];
    assert_eq!(s.daily_target, 1000.0);
    assert_eq!(s.total_service_value, 600.0);
    assert!(!s.target_achieved);
    assert_eq!(s.total_incentive_amount, 0.0);
    assert_eq!(s.service_count, 1);
}

#[test]
fn zero_target_never_achieves() {
    // No configured target value means the gate can never pass.
    let member = common::staff("S3", 26_000.0);
    let services = vec![common::service_line(5000.0, 10.0, Some(member.id))];
    let bill = common::bill(BillStatus::Completed, services, 5000.0);

    let program = DailyTargetIncentive::default();
    let summaries = build_staff_summaries(std::slice::from_ref(&bill), &[member], &program);

    let s = &summaries[0];
    assert_eq!(s.daily_target, 0.0);
    assert!(!s.target_achieved);
    assert_eq!(s.total_incentive_amount, 0.0);
}

#[test]
fn service_values_accumulate_across_bills() {
    let member = common::staff("S4", 26_000.0);
    let bill_a = common::bill(
        BillStatus::Completed,
        vec![common::service_line(300.0, 10.0, Some(member.id))],
        300.0,
    );
    let bill_b = common::bill(
        BillStatus::Completed,
        vec![common::service_line(400.0, 10.0, Some(member.id))],
        400.0,
    );

    let program = DailyTargetIncentive {
        target_value: 0.5,
        max_incentive: 0.0,
        enabled: true,
    };
    let summaries = build_staff_summaries(&[bill_a, bill_b], &[member], &program);

    let s = &summaries[0];
    // 700 across the day beats the 500 target; 30 + 40 of rounded amounts.
    assert_eq!(s.total_service_value, 700.0);
    assert!(s.target_achieved);
    assert_eq!(s.total_incentive_amount, 70.0);
    assert_eq!(s.service_count, 2);
}

#[test]
fn business_day_bounds_cover_one_full_day() {
    let instant = Utc.with_ymd_and_hms(2026, 8, 7, 4, 30, 0).unwrap();
    let (start, end) = business_day_bounds(instant, 330);
    assert!(start < end);
    assert_eq!(start.date_naive().to_string(), "2026-08-07");
    assert!(instant >= start - chrono::Duration::minutes(330));
    assert_eq!(
        end - start,
        chrono::Duration::days(1) - chrono::Duration::milliseconds(1)
    );
}

#[test]
fn late_evening_utc_rolls_into_the_next_business_day_under_ist() {
    // 19:30 UTC on Aug 6 is 01:00 on Aug 7 at +330 minutes.
    let instant = Utc.with_ymd_and_hms(2026, 8, 6, 19, 30, 0).unwrap();
    assert_eq!(date_number(instant, 330), 20260807);
    // A deployment configured for UTC keeps the same instant on Aug 6.
    assert_eq!(date_number(instant, 0), 20260806);
}
