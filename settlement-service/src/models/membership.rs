//! Membership line items and the client membership records they create.

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    /// Purchase converts into a wallet credit instead of a membership record.
    ValueAdded,
    FixDiscount,
    ServiceDiscount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Months,
    Years,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MembershipDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipBenefits {
    #[serde(default)]
    pub value_added_amount: f64,
    #[serde(default)]
    pub fix_discount_percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipPricing {
    #[serde(default)]
    pub purchase_amount: f64,
    #[serde(default)]
    pub final_price: f64,
}

/// Membership purchase carried as a bill line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipLine {
    pub membership_id: Option<Uuid>,
    pub name: String,
    pub membership_type: MembershipType,
    pub duration: MembershipDuration,
    #[serde(default)]
    pub pricing: MembershipPricing,
    #[serde(default)]
    pub benefits: MembershipBenefits,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMembership {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    pub membership_id: Option<Uuid>,
    pub membership_name: String,
    pub membership_type: MembershipType,
    pub purchase_amount: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub status: MembershipStatus,
    #[serde(default)]
    pub benefits: MembershipBenefits,
    pub duration: MembershipDuration,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Calendar-aware end date: months and years roll by calendar, not by a
/// fixed day count.
pub fn end_date_from(start: DateTime<Utc>, duration: &MembershipDuration) -> DateTime<Utc> {
    let result = match duration.unit {
        DurationUnit::Days => start.checked_add_days(Days::new(duration.value as u64)),
        DurationUnit::Months => start.checked_add_months(Months::new(duration.value)),
        DurationUnit::Years => start.checked_add_months(Months::new(duration.value * 12)),
    };
    result.unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_addition_is_calendar_aware() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap();
        let end = end_date_from(
            start,
            &MembershipDuration {
                value: 1,
                unit: DurationUnit::Months,
            },
        );
        // Jan 31 + 1 month clamps to the end of February.
        let end_date = end.date_naive();
        assert_eq!(end_date.to_string(), "2026-02-28");
    }

    #[test]
    fn year_addition_rolls_twelve_months() {
        let start = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        let end = end_date_from(
            start,
            &MembershipDuration {
                value: 2,
                unit: DurationUnit::Years,
            },
        );
        assert_eq!(end.date_naive().to_string(), "2028-03-15");
    }

    #[test]
    fn day_addition_is_exact() {
        let start = Utc.with_ymd_and_hms(2026, 12, 30, 0, 0, 0).unwrap();
        let end = end_date_from(
            start,
            &MembershipDuration {
                value: 5,
                unit: DurationUnit::Days,
            },
        );
        assert_eq!(end.date_naive().to_string(), "2027-01-04");
    }
}
