use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoredModel;
use crate::store::Collection;

/// Fulfillment from existing stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InternalProcessing {
    pub id: i64,
    pub sales_order_id: i64,
    pub breakdown_item_id: Option<i64>,
    pub warehouse_location: String,
    pub processed_quantity: i32,
    pub processing_date: NaiveDate,
    pub processed_by: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredModel for InternalProcessing {
    const KIND: &'static str = "internal processing";
    const COLLECTIONS: &'static [Collection] = &[Collection::InternalProcessing];

    fn id(&self) -> i64 {
        self.id
    }
}
