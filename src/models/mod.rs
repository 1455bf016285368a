//! Typed records of the fulfillment pipeline.
//!
//! Each entity is persisted as an untyped field map by the record store; the
//! structs here are the validated, typed view of those maps.

pub mod delivery_shipment;
pub mod inspection;
pub mod internal_processing;
pub mod item_breakdown;
pub mod purchase_order;
pub mod quotation;
pub mod receiving;
pub mod sales_order;

pub use delivery_shipment::{DeliveryShipment, ShipmentStatus};
pub use inspection::{InspectionMethod, InspectionResult, QualityInspection};
pub use internal_processing::InternalProcessing;
pub use item_breakdown::{BreakdownItemStatus, ItemBreakdown, ProcessingType};
pub use purchase_order::{PurchaseOrder, PurchaseOrderStatus, PurchaseType};
pub use quotation::{ApprovedQuotation, QuotationStatus};
pub use receiving::InventoryReceiving;
pub use sales_order::{FulfillmentRoute, SalesOrder, SalesOrderStatus};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    errors::ServiceError,
    store::{Collection, Record},
};

/// A typed entity stored in one (or, for purchase orders, one of several)
/// record collections.
pub trait StoredModel: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Human-readable entity name used in error messages and logs.
    const KIND: &'static str;

    /// Collections searched when looking a record up by id.
    const COLLECTIONS: &'static [Collection];

    fn id(&self) -> i64;

    /// Collection this particular record is written to.
    fn collection(&self) -> Collection {
        Self::COLLECTIONS[0]
    }

    fn describe(&self) -> String {
        format!("{} {}", Self::KIND, self.id())
    }

    fn from_record(record: Record) -> Result<Self, ServiceError> {
        serde_json::from_value(Value::Object(record)).map_err(ServiceError::from)
    }
}

/// Document number of the form `PREFIX-YYYYMMDD-XXXXXXXX`.
pub fn document_number(prefix: &str, date: NaiveDate) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        date.format("%Y%m%d"),
        suffix[..8].to_uppercase()
    )
}

/// Trims and rejects blank identity/location strings.
pub fn require_text(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::missing_field(field));
    }
    Ok(trimmed.to_string())
}

/// Like [`require_text`] for optional inputs.
pub fn require_some_text(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    require_text(value.unwrap_or_default(), field)
}

/// `unit * quantity`, rejected as invalid input when it does not fit a `Decimal`.
pub fn extended_total(unit: Decimal, quantity: i32, field: &str) -> Result<Decimal, ServiceError> {
    unit.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "{} of {} x {} overflows",
            field, unit, quantity
        ))
    })
}
