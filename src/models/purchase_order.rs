use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::StoredModel;
use crate::store::Collection;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseType {
    CustomerOrder,
    BreakdownExternal,
    InventoryReplenishment,
}

impl PurchaseType {
    pub fn collection(self) -> Collection {
        match self {
            PurchaseType::InventoryReplenishment => Collection::PurchaseOrdersInventory,
            PurchaseType::CustomerOrder | PurchaseType::BreakdownExternal => {
                Collection::PurchaseOrdersToSupplier
            }
        }
    }
}

/// Purchase order status; the declaration order is the lifecycle order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Ordered,
    Confirmed,
    Shipped,
    Received,
    Completed,
}

impl PurchaseOrderStatus {
    pub fn next(self) -> Option<Self> {
        match self {
            PurchaseOrderStatus::Ordered => Some(PurchaseOrderStatus::Confirmed),
            PurchaseOrderStatus::Confirmed => Some(PurchaseOrderStatus::Shipped),
            PurchaseOrderStatus::Shipped => Some(PurchaseOrderStatus::Received),
            PurchaseOrderStatus::Received => Some(PurchaseOrderStatus::Completed),
            PurchaseOrderStatus::Completed => None,
        }
    }

    /// Only the immediate successor is reachable.
    pub fn can_transition_to(self, next: PurchaseOrderStatus) -> bool {
        self.next() == Some(next)
    }

    /// Goods may be received before the supplier confirms or ships.
    pub fn accepts_receiving(self) -> bool {
        self != PurchaseOrderStatus::Completed
    }
}

/// An external procurement commitment to a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrder {
    pub id: i64,
    pub po_number: String,
    pub purchase_type: PurchaseType,
    pub sales_order_id: Option<i64>,
    pub breakdown_item_id: Option<i64>,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub item_code: Option<String>,
    pub item_description: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub currency: String,
    pub order_date: NaiveDate,
    pub expected_arrival_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Claim token held while the single receiving is being written.
    #[serde(default)]
    pub receiving_claim: Option<String>,
    #[serde(default)]
    pub receiving_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn is_received(&self) -> bool {
        self.receiving_claim.is_some()
    }
}

impl StoredModel for PurchaseOrder {
    const KIND: &'static str = "purchase order";
    const COLLECTIONS: &'static [Collection] = &[
        Collection::PurchaseOrdersToSupplier,
        Collection::PurchaseOrdersInventory,
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn collection(&self) -> Collection {
        self.purchase_type.collection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;
    use PurchaseOrderStatus::*;

    #[rstest]
    #[case(Ordered, Confirmed, true)]
    #[case(Confirmed, Shipped, true)]
    #[case(Shipped, Received, true)]
    #[case(Received, Completed, true)]
    #[case(Ordered, Shipped, false)]
    #[case(Ordered, Received, false)]
    #[case(Shipped, Ordered, false)]
    #[case(Completed, Received, false)]
    #[case(Confirmed, Confirmed, false)]
    fn forward_single_step(
        #[case] from: PurchaseOrderStatus,
        #[case] to: PurchaseOrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn next_never_goes_backward() {
        for status in PurchaseOrderStatus::iter() {
            if let Some(next) = status.next() {
                assert!(next > status);
            }
        }
    }

    #[test]
    fn replenishment_orders_live_in_inventory_collection() {
        assert_eq!(
            PurchaseType::InventoryReplenishment.collection(),
            Collection::PurchaseOrdersInventory
        );
        assert_eq!(
            PurchaseType::BreakdownExternal.collection(),
            Collection::PurchaseOrdersToSupplier
        );
    }

    #[test]
    fn receiving_accepted_until_completed() {
        assert!(Ordered.accepts_receiving());
        assert!(Shipped.accepts_receiving());
        assert!(Received.accepts_receiving());
        assert!(!Completed.accepts_receiving());
    }
}
