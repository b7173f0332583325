//! Read-only collaborators: the service catalog and the staff directory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry for a salon service. Services may consume a backing
/// product, which is what ties them into inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalonService {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_product_required: bool,
    pub product_id: Option<Uuid>,
    /// Default incentive percentage for this service.
    #[serde(default)]
    pub incentive: f64,
}

/// Staff directory row, as exposed by the user service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub unit_ids: Vec<Uuid>,
}
