//! Record store gateway.
//!
//! The pipeline never talks to a database directly. Every read and write goes
//! through [`RecordStore`], which exposes untyped field maps grouped into named
//! collections. Typed access lives in [`crate::repositories`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::ServiceError;

pub mod memory;
pub mod sql;

pub use memory::InMemoryRecordStore;
pub use sql::SqlRecordStore;

/// Untyped field map as persisted by the gateway.
pub type Record = Map<String, Value>;

/// Field names stamped by every backend.
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Named collections of the fulfillment pipeline.
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
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    SalesProcess,
    ProcessItemBreakdown,
    PurchaseOrdersToSupplier,
    PurchaseOrdersInventory,
    InventoryReceiving,
    QualityInspection,
    DeliveryShipment,
    InternalProcessing,
}

/// Conjunction of field-equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Absent fields compare equal to `null`.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| field_value(record, field) == expected)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Result of a guarded update.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// Guard matched; carries the record after the patch.
    Updated(Record),
    /// Guard did not match; carries the record as currently stored.
    Mismatch(Record),
    Missing,
}

pub(crate) fn field_value<'a>(record: &'a Record, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&Value::Null)
}

pub(crate) fn merge_patch(target: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

/// Storage contract the pipeline is built on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records of `collection` matching `filter`, ordered by id.
    async fn fetch(&self, collection: Collection, filter: &Filter)
        -> Result<Vec<Record>, ServiceError>;

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, ServiceError>;

    /// Persists a new record and returns it with `id` and timestamps assigned.
    async fn insert(&self, collection: Collection, record: Record) -> Result<Record, ServiceError>;

    /// Merges `patch` into the record; `None` when the id does not exist.
    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Record,
    ) -> Result<Option<Record>, ServiceError>;

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, ServiceError>;

    /// Applies `patch` only if `field` currently equals `expected`.
    /// The check and the write are atomic with respect to other callers.
    async fn compare_and_update(
        &self,
        collection: Collection,
        id: i64,
        field: &str,
        expected: &Value,
        patch: Record,
    ) -> Result<CasOutcome, ServiceError>;
}
