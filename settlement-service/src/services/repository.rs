//! Bill persistence, id allocation counters, and read-only directories.

use chrono::{DateTime, Datelike, Utc};
use futures::TryStreamExt;
use mongodb::bson::DateTime as BsonDateTime;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{Bill, BillStatus, SalonService, Staff};
use crate::services::metrics::DB_QUERY_DURATION;

/// Named sequence row backing bill numbers and ledger transaction ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

/// Atomically advance a named sequence and return the new value.
pub async fn next_sequence(counters: &Collection<Counter>, name: &str) -> Result<i64, AppError> {
    let counter = counters
        .find_one_and_update(
            doc! { "_id": name },
            doc! { "$inc": { "seq": 1_i64 } },
            FindOneAndUpdateOptions::builder()
                .upsert(true)
                .return_document(ReturnDocument::After)
                .build(),
        )
        .await?
        .ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("counter upsert returned no document"))
        })?;
    Ok(counter.seq)
}

#[derive(Clone)]
pub struct BillRepository {
    bills: Collection<Bill>,
    counters: Collection<Counter>,
}

impl BillRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            bills: db.collection("bills"),
            counters: db.collection("counters"),
        }
    }

    /// Initialize indexes for bill lookups.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let transaction_idx = IndexModel::builder()
            .keys(doc! { "transaction_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("bill_transaction_idx".to_string())
                    .build(),
            )
            .build();

        let number_idx = IndexModel::builder()
            .keys(doc! { "bill_number": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("bill_number_idx".to_string())
                    .build(),
            )
            .build();

        let unit_day_idx = IndexModel::builder()
            .keys(doc! { "unit_id": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("bill_unit_day_idx".to_string())
                    .build(),
            )
            .build();

        self.bills
            .create_indexes([transaction_idx, number_idx, unit_day_idx], None)
            .await?;

        info!("Bill indexes initialized");
        Ok(())
    }

    /// Allocate the next sequential bill number, e.g. `BILL-2026-42`.
    #[instrument(skip(self))]
    pub async fn next_bill_number(&self) -> Result<String, AppError> {
        let seq = next_sequence(&self.counters, "bill_number").await?;
        Ok(format!("BILL-{}-{}", Utc::now().year(), seq))
    }

    /// Opaque settlement transaction id, e.g. `TXN-1754550000000-9f3ab21c4`.
    pub fn new_transaction_id() -> String {
        let millis = Utc::now().timestamp_millis();
        let rand = Uuid::new_v4().simple().to_string();
        format!("TXN-{}-{}", millis, &rand[..9])
    }

    #[instrument(skip(self, bill), fields(bill_number = %bill.bill_number))]
    pub async fn insert(&self, bill: &Bill) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_bill"])
            .start_timer();
        self.bills.insert_one(bill, None).await?;
        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_bill"])
            .start_timer();
        let bill = self
            .bills
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        timer.observe_duration();
        Ok(bill)
    }

    /// Persist the full document back, per-document save semantics.
    #[instrument(skip(self, bill), fields(bill_number = %bill.bill_number))]
    pub async fn replace(&self, bill: &Bill) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_bill"])
            .start_timer();
        self.bills
            .replace_one(doc! { "_id": bill.id.to_string() }, bill, None)
            .await?;
        timer.observe_duration();
        Ok(())
    }

    /// Bills for one unit inside a business-day window, excluding cancelled
    /// and refunded ones.
    #[instrument(skip(self))]
    pub async fn find_for_business_day(
        &self,
        unit_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_bills_for_day"])
            .start_timer();
        let filter = doc! {
            "unit_id": unit_id.to_string(),
            "created_at": {
                "$gte": BsonDateTime::from_chrono(start),
                "$lte": BsonDateTime::from_chrono(end),
            },
            "status": {
                "$nin": [BillStatus::Cancelled.as_str(), BillStatus::Refunded.as_str()]
            },
        };
        let cursor = self.bills.find(filter, None).await?;
        let bills: Vec<Bill> = cursor.try_collect().await?;
        timer.observe_duration();
        Ok(bills)
    }
}

/// Read-only lookup into the service catalog.
#[derive(Clone)]
pub struct CatalogRepository {
    services: Collection<SalonService>,
}

impl CatalogRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            services: db.collection("services"),
        }
    }

    pub async fn find_service(&self, id: Uuid) -> Result<Option<SalonService>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_service"])
            .start_timer();
        let service = self
            .services
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        timer.observe_duration();
        Ok(service)
    }
}

/// Read-only staff directory backed by the shared users collection.
#[derive(Clone)]
pub struct DirectoryService {
    users: Collection<Staff>,
}

impl DirectoryService {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
        }
    }

    /// Staff rows for the given ids, scoped to one unit.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn find_staff_in_unit(
        &self,
        ids: &[Uuid],
        unit_id: Uuid,
    ) -> Result<Vec<Staff>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_staff"])
            .start_timer();
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let filter = doc! {
            "_id": { "$in": id_strings },
            "unit_ids": unit_id.to_string(),
        };
        let cursor = self.users.find(filter, None).await?;
        let staff: Vec<Staff> = cursor.try_collect().await?;
        timer.observe_duration();
        Ok(staff)
    }

    /// Display names for the given staff ids. Missing rows are simply
    /// absent from the map.
    pub async fn names_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let cursor = self
            .users
            .find(doc! { "_id": { "$in": id_strings } }, None)
            .await?;
        let staff: Vec<Staff> = cursor.try_collect().await?;
        Ok(staff.into_iter().map(|s| (s.id, s.name)).collect())
    }
}
