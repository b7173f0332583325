mod common;

use chrono::{Datelike, TimeZone, Utc};
use settlement_service::models::{
    end_date_from, DurationUnit, MembershipDuration, MembershipType,
};

#[test]
fn value_added_lines_target_the_wallet() {
    let line = common::value_added_membership(200.0);
    assert_eq!(line.membership_type, MembershipType::ValueAdded);
    assert_eq!(line.benefits.value_added_amount, 200.0);
}

#[test]
fn day_durations_add_exact_days() {
    let start = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
    let end = end_date_from(
        start,
        &MembershipDuration {
            value: 90,
            unit: DurationUnit::Days,
        },
    );
    assert_eq!((end - start).num_days(), 90);
}

#[test]
fn month_durations_land_on_the_same_day_of_month() {
    let start = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
    let end = end_date_from(
        start,
        &MembershipDuration {
            value: 6,
            unit: DurationUnit::Months,
        },
    );
    assert_eq!(end.date_naive().to_string(), "2027-02-07");
}

#[test]
fn month_end_start_dates_clamp_instead_of_overflowing() {
    let start = Utc.with_ymd_and_hms(2026, 10, 31, 9, 0, 0).unwrap();
    let end = end_date_from(
        start,
        &MembershipDuration {
            value: 1,
            unit: DurationUnit::Months,
        },
    );
    // October 31 + 1 month clamps to November 30, not December 1.
    assert_eq!(end.date_naive().to_string(), "2026-11-30");
}

#[test]
fn year_durations_are_calendar_years_not_365_day_blocks() {
    // Across a leap year, fixed-day arithmetic would drift.
    let start = Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap();
    let end = end_date_from(
        start,
        &MembershipDuration {
            value: 2,
            unit: DurationUnit::Years,
        },
    );
    assert_eq!(end.year(), 2029);
    assert_eq!(end.month(), 6);
    assert_eq!(end.day(), 1);
}
