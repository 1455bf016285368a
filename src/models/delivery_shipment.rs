use chrono::{DateTime, NaiveDate, Utc};
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
pub enum ShipmentStatus {
    Preparing,
    Shipped,
    InTransit,
    Delivered,
    Returned,
}

impl ShipmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Returned)
    }

    /// Forward chain plus a `returned` exit from any live state.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Preparing, Shipped) | (Shipped, InTransit) | (InTransit, Delivered) | (_, Returned)
        )
    }
}

/// Outbound delivery of inspected, approved goods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryShipment {
    pub id: i64,
    pub shipment_number: String,
    pub inspection_id: i64,
    pub purchase_order_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub shipment_date: NaiveDate,
    pub shipped_by: String,
    pub shipment_quantity: i32,
    pub delivery_method: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_contact: Option<String>,
    pub tracking_number: Option<String>,
    pub shipment_status: ShipmentStatus,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredModel for DeliveryShipment {
    const KIND: &'static str = "shipment";
    const COLLECTIONS: &'static [Collection] = &[Collection::DeliveryShipment];

    fn id(&self) -> i64 {
        self.id
    }
}
