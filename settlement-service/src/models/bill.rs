//! Bill document: the settlement unit.

use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::membership::MembershipLine;

/// Bill lifecycle status. Side effects key off transitions into `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Completed,
    Pending,
    Cancelled,
    Refunded,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Pending => "PENDING",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Cancelled and refunded bills never fire new settlement side effects.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Pending,
    Partial,
    Cancelled,
}

/// Denormalized client summary carried on the bill.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientSummary {
    pub id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    pub phone_number: Option<String>,
    /// When the client record was created; drives new-vs-returning counting.
    pub created_at: Option<BsonDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinePricing {
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub final_price: f64,
    #[serde(default)]
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLine {
    /// Catalog service id; lines without one are skipped by inventory.
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub pricing: LinePricing,
    pub staff_id: Option<Uuid>,
    /// Incentive percentage for the assigned staff member.
    #[serde(default)]
    pub incentive_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLine {
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub pricing: LinePricing,
    pub staff_id: Option<Uuid>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMethods {
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub card: f64,
    #[serde(default)]
    pub upi: f64,
    #[serde(default)]
    pub wallet: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Payment {
    #[serde(default)]
    pub methods: PaymentMethods,
    #[validate(range(min = 0.0))]
    pub total_paid: f64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillTotals {
    #[serde(default)]
    pub final_amount: f64,
    #[serde(default)]
    pub total_discount: f64,
    #[serde(default)]
    pub coupon_discount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub transaction_id: String,
    pub bill_number: String,
    pub status: BillStatus,
    pub client: ClientSummary,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub new_memberships: Vec<MembershipLine>,
    pub payment: Payment,
    pub totals: BillTotals,
    pub applied_coupon_code: Option<String>,
    #[serde(default)]
    pub change_returned: f64,
    pub unit_id: Uuid,
    pub created_by: Uuid,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<BsonDateTime>,
    pub refund_amount: Option<f64>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<BsonDateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Amount paid from the client's wallet, zero when no wallet payment.
    pub fn wallet_amount(&self) -> f64 {
        self.payment.methods.wallet
    }

    /// Unique staff ids across service, product and membership lines.
    pub fn staff_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::new();
        let mut push = |id: Option<Uuid>| {
            if let Some(id) = id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        };
        for line in &self.services {
            push(line.staff_id);
        }
        for line in &self.products {
            push(line.staff_id);
        }
        for line in &self.new_memberships {
            push(line.staff_id);
        }
        ids
    }
}

/// Inbound payload for creating a bill. Ids and timestamps are allocated by
/// the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBill {
    #[serde(default = "default_status")]
    pub status: BillStatus,
    #[validate(nested)]
    pub client: ClientSummary,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub new_memberships: Vec<MembershipLine>,
    #[validate(nested)]
    pub payment: Payment,
    #[serde(default)]
    pub totals: BillTotals,
    pub applied_coupon_code: Option<String>,
    #[serde(default)]
    pub change_returned: f64,
    pub unit_id: Uuid,
    pub created_by: Uuid,
}

fn default_status() -> BillStatus {
    BillStatus::Completed
}

/// Partial update applied on top of a stored bill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillPatch {
    pub status: Option<BillStatus>,
    pub services: Option<Vec<ServiceLine>>,
    pub products: Option<Vec<ProductLine>>,
    pub new_memberships: Option<Vec<MembershipLine>>,
    pub payment: Option<Payment>,
    pub totals: Option<BillTotals>,
    pub change_returned: Option<f64>,
}

impl BillPatch {
    pub fn apply_to(&self, bill: &mut Bill) {
        if let Some(status) = self.status {
            bill.status = status;
        }
        if let Some(services) = &self.services {
            bill.services = services.clone();
        }
        if let Some(products) = &self.products {
            bill.products = products.clone();
        }
        if let Some(memberships) = &self.new_memberships {
            bill.new_memberships = memberships.clone();
        }
        if let Some(payment) = &self.payment {
            bill.payment = payment.clone();
        }
        if let Some(totals) = &self.totals {
            bill.totals = totals.clone();
        }
        if let Some(change) = self.change_returned {
            bill.change_returned = change;
        }
    }

    /// Wallet amount carried by this patch, if any.
    pub fn wallet_amount(&self) -> f64 {
        self.payment
            .as_ref()
            .map(|p| p.methods.wallet)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_ids_deduplicates_across_line_kinds() {
        let staff = Uuid::new_v4();
        let other = Uuid::new_v4();
        let bill = Bill {
            id: Uuid::new_v4(),
            transaction_id: "TXN-1".into(),
            bill_number: "BILL-2026-1".into(),
            status: BillStatus::Completed,
            client: ClientSummary {
                id: Uuid::new_v4(),
                name: "A".into(),
                phone_number: None,
                created_at: None,
            },
            services: vec![ServiceLine {
                id: None,
                name: "Haircut".into(),
                quantity: 1,
                pricing: LinePricing::default(),
                staff_id: Some(staff),
                incentive_pct: 0.0,
            }],
            products: vec![ProductLine {
                id: None,
                name: "Shampoo".into(),
                quantity: 1,
                pricing: LinePricing::default(),
                staff_id: Some(staff),
            }],
            new_memberships: vec![],
            payment: Payment {
                methods: PaymentMethods::default(),
                total_paid: 0.0,
                payment_status: PaymentStatus::Paid,
            },
            totals: BillTotals::default(),
            applied_coupon_code: None,
            change_returned: 0.0,
            unit_id: Uuid::new_v4(),
            created_by: other,
            cancellation_reason: None,
            cancelled_at: None,
            refund_amount: None,
            refund_reason: None,
            refunded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(bill.staff_ids(), vec![staff]);
    }
}
