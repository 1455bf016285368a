use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoredModel;
use crate::store::Collection;

/// Physical arrival of goods against a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryReceiving {
    pub id: i64,
    pub receiving_number: String,
    pub purchase_order_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub breakdown_item_id: Option<i64>,
    pub received_date: NaiveDate,
    pub received_by: String,
    pub received_quantity: i32,
    pub expected_quantity: Option<i32>,
    pub warehouse_location: String,
    #[serde(default)]
    pub condition_notes: Option<String>,
    #[serde(default)]
    pub inspection_claim: Option<String>,
    #[serde(default)]
    pub inspection_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryReceiving {
    pub fn is_inspected(&self) -> bool {
        self.inspection_claim.is_some()
    }

    /// Received minus expected; `None` when nothing was expected.
    pub fn discrepancy(&self) -> Option<i32> {
        self.expected_quantity
            .map(|expected| self.received_quantity - expected)
            .filter(|delta| *delta != 0)
    }
}

impl StoredModel for InventoryReceiving {
    const KIND: &'static str = "receiving";
    const COLLECTIONS: &'static [Collection] = &[Collection::InventoryReceiving];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Operator-facing note describing a short or over delivery.
pub fn discrepancy_note(received: i32, expected: i32) -> Option<String> {
    match received.cmp(&expected) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Less => Some(format!(
            "Short delivery: received {} of {} ordered ({} missing)",
            received,
            expected,
            expected - received
        )),
        std::cmp::Ordering::Greater => Some(format!(
            "Over delivery: received {} against {} ordered ({} extra)",
            received,
            expected,
            received - expected
        )),
    }
}
