//! Inventory reduction for settled bills.
//!
//! Stock rows are keyed by (product, unit). Missing catalog services,
//! services without a backing product, and missing inventory rows are all
//! non-fatal skips. Quantities are decremented with no floor, so stock
//! can go negative.

use mongodb::bson::DateTime as BsonDateTime;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use service_core::error::AppError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Bill, Inventory, InventoryTransaction, MovementKind, MovementReference, ProductLine,
    ServiceLine,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::CatalogRepository;

/// Result of one reduction pass over a bill's line items.
#[derive(Debug, Default)]
pub struct InventoryAdjustment {
    pub updated: Vec<Inventory>,
    pub transactions: Vec<InventoryTransaction>,
}

#[derive(Clone)]
pub struct InventoryService {
    inventory: Collection<Inventory>,
    transactions: Collection<InventoryTransaction>,
    catalog: CatalogRepository,
}

impl InventoryService {
    pub fn new(db: &Database, catalog: CatalogRepository) -> Self {
        Self {
            inventory: db.collection("inventory"),
            transactions: db.collection("inventory_transactions"),
            catalog,
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let stock_idx = IndexModel::builder()
            .keys(doc! { "product_id": 1, "unit_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("inventory_product_unit_idx".to_string())
                    .build(),
            )
            .build();
        self.inventory.create_indexes([stock_idx], None).await?;

        let history_idx = IndexModel::builder()
            .keys(doc! { "inventory_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("inventory_tx_history_idx".to_string())
                    .build(),
            )
            .build();
        self.transactions.create_indexes([history_idx], None).await?;

        info!("Inventory indexes initialized");
        Ok(())
    }

    /// Reduce stock for services that consume a backing product.
    #[instrument(skip(self, services, bill), fields(bill_number = %bill.bill_number, count = services.len()))]
    pub async fn reduce_for_services(
        &self,
        services: &[ServiceLine],
        bill: &Bill,
    ) -> Result<InventoryAdjustment, AppError> {
        let mut adjustment = InventoryAdjustment::default();

        for line in services {
            let service_id = match line.id {
                Some(id) => id,
                None => {
                    debug!(service = %line.name, "service line has no catalog id, skipping");
                    continue;
                }
            };

            let service = match self.catalog.find_service(service_id).await? {
                Some(service) => service,
                None => {
                    warn!(service_id = %service_id, service = %line.name, "catalog service not found, skipping inventory");
                    continue;
                }
            };

            let product_id = match (service.is_product_required, service.product_id) {
                (true, Some(product_id)) => product_id,
                _ => {
                    debug!(service = %service.name, "service requires no product, skipping inventory");
                    continue;
                }
            };

            let reason = format!(
                "Used in service: {} for bill: {}",
                service.name, bill.bill_number
            );
            if let Some((inventory, transaction)) = self
                .reduce(product_id, bill.unit_id, line.quantity as i64, reason, bill)
                .await?
            {
                adjustment.updated.push(inventory);
                adjustment.transactions.push(transaction);
            }
        }

        info!(
            bill_number = %bill.bill_number,
            updated = adjustment.updated.len(),
            "service inventory reduction done"
        );
        Ok(adjustment)
    }

    /// Reduce stock for products sold directly on the bill.
    #[instrument(skip(self, products, bill), fields(bill_number = %bill.bill_number, count = products.len()))]
    pub async fn reduce_for_products(
        &self,
        products: &[ProductLine],
        bill: &Bill,
    ) -> Result<InventoryAdjustment, AppError> {
        let mut adjustment = InventoryAdjustment::default();

        for line in products {
            let product_id = match line.id {
                Some(id) => id,
                None => {
                    debug!(product = %line.name, "product line has no id, skipping");
                    continue;
                }
            };

            let reason = format!("Product sold in bill: {}", bill.bill_number);
            if let Some((inventory, transaction)) = self
                .reduce(product_id, bill.unit_id, line.quantity as i64, reason, bill)
                .await?
            {
                adjustment.updated.push(inventory);
                adjustment.transactions.push(transaction);
            }
        }

        info!(
            bill_number = %bill.bill_number,
            updated = adjustment.updated.len(),
            "product inventory reduction done"
        );
        Ok(adjustment)
    }

    /// Atomically decrement one stock row and append the movement record.
    /// Returns `None` when no row exists for (product, unit).
    async fn reduce(
        &self,
        product_id: Uuid,
        unit_id: Uuid,
        qty: i64,
        reason: String,
        bill: &Bill,
    ) -> Result<Option<(Inventory, InventoryTransaction)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reduce_inventory"])
            .start_timer();

        let updated = self
            .inventory
            .find_one_and_update(
                doc! {
                    "product_id": product_id.to_string(),
                    "unit_id": unit_id.to_string(),
                },
                doc! {
                    "$inc": { "qty": -qty, "stock_out": qty },
                    "$set": { "updated_at": BsonDateTime::now() },
                },
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;

        let inventory = match updated {
            Some(inventory) => inventory,
            None => {
                timer.observe_duration();
                warn!(product_id = %product_id, unit_id = %unit_id, "inventory row not found, skipping");
                return Ok(None);
            }
        };

        let transaction = InventoryTransaction {
            id: Uuid::new_v4(),
            inventory_id: inventory.id,
            product_id,
            unit_id,
            kind: MovementKind::Out,
            qty,
            previous_qty: inventory.qty + qty,
            new_qty: inventory.qty,
            reason,
            reference_id: Some(bill.id),
            reference_type: MovementReference::Sale,
            created_by: bill.created_by,
            created_at: chrono::Utc::now(),
        };
        self.transactions.insert_one(&transaction, None).await?;

        timer.observe_duration();
        debug!(
            product_id = %product_id,
            qty = qty,
            new_qty = inventory.qty,
            "inventory reduced"
        );
        Ok(Some((inventory, transaction)))
    }
}
