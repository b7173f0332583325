//! Shared fixtures for settlement-service integration tests.

use chrono::{Duration, Utc};
use std::sync::Once;
use settlement_service::models::{
    Bill, BillStatus, BillTotals, ClientSummary, LinePricing, MembershipBenefits,
    MembershipDuration, MembershipLine, MembershipPricing, MembershipType, Payment,
    PaymentMethods, PaymentStatus, ProductLine, ServiceLine, Staff,
};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,settlement_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn client(created_days_ago: i64) -> ClientSummary {
    ClientSummary {
        id: Uuid::new_v4(),
        name: "Asha Rao".to_string(),
        phone_number: Some("9876500000".to_string()),
        created_at: Some(mongodb::bson::DateTime::from_chrono(
            Utc::now() - Duration::days(created_days_ago),
        )),
    }
}

pub fn service_line(final_price: f64, incentive_pct: f64, staff_id: Option<Uuid>) -> ServiceLine {
    ServiceLine {
        id: Some(Uuid::new_v4()),
        name: "Haircut".to_string(),
        quantity: 1,
        pricing: LinePricing {
            base_price: final_price,
            final_price,
            total_price: final_price,
        },
        staff_id,
        incentive_pct,
    }
}

pub fn product_line(total_price: f64, quantity: u32) -> ProductLine {
    ProductLine {
        id: Some(Uuid::new_v4()),
        name: "Argan Oil".to_string(),
        quantity,
        pricing: LinePricing {
            base_price: total_price,
            final_price: total_price,
            total_price,
        },
        staff_id: None,
    }
}

pub fn value_added_membership(amount: f64) -> MembershipLine {
    MembershipLine {
        membership_id: Some(Uuid::new_v4()),
        name: "Gold Wallet Pack".to_string(),
        membership_type: MembershipType::ValueAdded,
        duration: MembershipDuration {
            value: 12,
            unit: settlement_service::models::DurationUnit::Months,
        },
        pricing: MembershipPricing {
            purchase_amount: amount,
            final_price: amount,
        },
        benefits: MembershipBenefits {
            value_added_amount: amount,
            fix_discount_percentage: 0.0,
        },
        staff_id: None,
    }
}

pub fn payment(total_paid: f64, wallet: f64, cash: f64) -> Payment {
    Payment {
        methods: PaymentMethods {
            cash,
            card: 0.0,
            upi: 0.0,
            wallet,
        },
        total_paid,
        payment_status: PaymentStatus::Paid,
    }
}

pub fn bill(status: BillStatus, services: Vec<ServiceLine>, final_amount: f64) -> Bill {
    let now = Utc::now();
    Bill {
        id: Uuid::new_v4(),
        transaction_id: format!("TXN-{}-test", now.timestamp_millis()),
        bill_number: "BILL-2026-1".to_string(),
        status,
        client: client(400),
        services,
        products: Vec::new(),
        new_memberships: Vec::new(),
        payment: payment(final_amount, 0.0, final_amount),
        totals: BillTotals {
            final_amount,
            total_discount: 0.0,
            coupon_discount: 0.0,
        },
        applied_coupon_code: None,
        change_returned: 0.0,
        unit_id: Uuid::new_v4(),
        created_by: Uuid::new_v4(),
        cancellation_reason: None,
        cancelled_at: None,
        refund_amount: None,
        refund_reason: None,
        refunded_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn staff(name: &str, salary: f64) -> Staff {
    Staff {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: None,
        salary,
        unit_ids: vec![Uuid::new_v4()],
    }
}
