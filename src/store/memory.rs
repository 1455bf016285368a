use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use super::{
    field_value, merge_patch, CasOutcome, Collection, Filter, Record, RecordStore,
    CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::errors::ServiceError;

/// Process-local store used by tests and single-node deployments.
///
/// Each collection is one dashmap entry, so writes to a collection are
/// serialised by that entry's shard lock while different collections proceed
/// independently. Ids come from one sequence shared by all collections.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    collections: DashMap<Collection, BTreeMap<i64, Record>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .get(&collection)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Record>, ServiceError> {
        let rows = match self.collections.get(&collection) {
            Some(rows) => rows
                .values()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(rows)
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, ServiceError> {
        Ok(self
            .collections
            .get(&collection)
            .and_then(|rows| rows.get(&id).cloned()))
    }

    async fn insert(
        &self,
        collection: Collection,
        mut record: Record,
    ) -> Result<Record, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = now_value();
        record.insert(ID_FIELD.to_string(), Value::from(id));
        record.insert(CREATED_AT_FIELD.to_string(), now.clone());
        record.insert(UPDATED_AT_FIELD.to_string(), now);

        self.collections
            .entry(collection)
            .or_default()
            .insert(id, record.clone());
        debug!(%collection, id, "record inserted");
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Record,
    ) -> Result<Option<Record>, ServiceError> {
        let mut rows = self.collections.entry(collection).or_default();
        let updated = rows.get_mut(&id).map(|record| {
            merge_patch(record, patch);
            record.insert(UPDATED_AT_FIELD.to_string(), now_value());
            record.clone()
        });
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, ServiceError> {
        Ok(self
            .collections
            .get_mut(&collection)
            .map(|mut rows| rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn compare_and_update(
        &self,
        collection: Collection,
        id: i64,
        field: &str,
        expected: &Value,
        patch: Record,
    ) -> Result<CasOutcome, ServiceError> {
        let mut rows = self.collections.entry(collection).or_default();
        let Some(record) = rows.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };

        if field_value(record, field) != expected {
            return Ok(CasOutcome::Mismatch(record.clone()));
        }

        merge_patch(record, patch);
        record.insert(UPDATED_AT_FIELD.to_string(), now_value());
        Ok(CasOutcome::Updated(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn ids_are_unique_across_collections() {
        let store = InMemoryRecordStore::new();
        let a = store
            .insert(Collection::SalesProcess, record(json!({ "qty": 1 })))
            .await
            .unwrap();
        let b = store
            .insert(Collection::DeliveryShipment, record(json!({ "qty": 2 })))
            .await
            .unwrap();
        assert_ne!(a["id"], b["id"]);
        assert!(a.contains_key("created_at"));
        assert_eq!(store.len(Collection::SalesProcess), 1);
    }

    #[tokio::test]
    async fn fetch_filters_and_orders_by_id() {
        let store = InMemoryRecordStore::new();
        for status in ["ordered", "received", "ordered"] {
            store
                .insert(
                    Collection::PurchaseOrdersToSupplier,
                    record(json!({ "status": status })),
                )
                .await
                .unwrap();
        }
        let rows = store
            .fetch(
                Collection::PurchaseOrdersToSupplier,
                &Filter::new().eq("status", "ordered"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["id"].as_i64() < rows[1]["id"].as_i64());
    }

    #[tokio::test]
    async fn update_and_delete_unknown_ids() {
        let store = InMemoryRecordStore::new();
        let patched = store
            .update(Collection::QualityInspection, 42, Record::new())
            .await
            .unwrap();
        assert!(patched.is_none());
        assert!(!store.delete(Collection::QualityInspection, 42).await.unwrap());
    }

    #[tokio::test]
    async fn compare_and_update_applies_once() {
        let store = InMemoryRecordStore::new();
        let po = store
            .insert(
                Collection::PurchaseOrdersToSupplier,
                record(json!({ "status": "ordered" })),
            )
            .await
            .unwrap();
        let id = po["id"].as_i64().unwrap();

        let first = store
            .compare_and_update(
                Collection::PurchaseOrdersToSupplier,
                id,
                "receiving_id",
                &Value::Null,
                record(json!({ "receiving_id": "claimed" })),
            )
            .await
            .unwrap();
        assert_matches!(first, CasOutcome::Updated(_));

        let second = store
            .compare_and_update(
                Collection::PurchaseOrdersToSupplier,
                id,
                "receiving_id",
                &Value::Null,
                record(json!({ "receiving_id": "claimed" })),
            )
            .await
            .unwrap();
        assert_matches!(second, CasOutcome::Mismatch(current) => {
            assert_eq!(current["receiving_id"], json!("claimed"));
        });

        let missing = store
            .compare_and_update(
                Collection::PurchaseOrdersToSupplier,
                id + 100,
                "receiving_id",
                &Value::Null,
                Record::new(),
            )
            .await
            .unwrap();
        assert_eq!(missing, CasOutcome::Missing);
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let store = Arc::new(InMemoryRecordStore::new());
        let parent = store
            .insert(Collection::InventoryReceiving, record(json!({})))
            .await
            .unwrap();
        let id = parent["id"].as_i64().unwrap();

        let mut tasks = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let outcome = store
                    .compare_and_update(
                        Collection::InventoryReceiving,
                        id,
                        "inspection_id",
                        &Value::Null,
                        record(json!({ "inspection_id": format!("claim-{}", n) })),
                    )
                    .await
                    .unwrap();
                matches!(outcome, CasOutcome::Updated(_))
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
