//! Typed access to the record store.

use serde::Serialize;
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{
        DeliveryShipment, InternalProcessing, InventoryReceiving, ItemBreakdown, PurchaseOrder,
        QualityInspection, SalesOrder, StoredModel,
    },
    store::{CasOutcome, Collection, Filter, Record, RecordStore},
};

/// Repository for one entity kind.
pub struct Repository<M: StoredModel> {
    store: Arc<dyn RecordStore>,
    _model: PhantomData<fn() -> M>,
}

impl<M: StoredModel> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<M: StoredModel> Repository<M> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _model: PhantomData,
        }
    }

    /// Find a record by id in any of the entity's collections
    pub async fn find_by_id(&self, id: i64) -> Result<Option<M>, ServiceError> {
        for collection in M::COLLECTIONS {
            if let Some(record) = self.store.get(*collection, id).await? {
                return M::from_record(record).map(Some);
            }
        }
        Ok(None)
    }

    /// Like [`Self::find_by_id`] but a missing record is a `NotFound` error
    pub async fn get(&self, id: i64) -> Result<M, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} does not exist", M::KIND, id)))
    }

    /// Records matching `filter` across all of the entity's collections, ordered by id
    pub async fn find(&self, filter: &Filter) -> Result<Vec<M>, ServiceError> {
        let mut models = Vec::new();
        for collection in M::COLLECTIONS {
            models.extend(self.find_in(*collection, filter).await?);
        }
        models.sort_by_key(|model| model.id());
        Ok(models)
    }

    pub async fn find_in(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<M>, ServiceError> {
        self.store
            .fetch(collection, filter)
            .await?
            .into_iter()
            .map(M::from_record)
            .collect()
    }

    /// Persists a draft and returns the stored model
    pub async fn insert<D: Serialize>(
        &self,
        collection: Collection,
        draft: &D,
    ) -> Result<M, ServiceError> {
        let record = to_record(draft)?;
        let stored = self.store.insert(collection, record).await.map_err(|e| {
            error!("Failed to insert {} into {}: {}", M::KIND, collection, e);
            e
        })?;
        M::from_record(stored)
    }

    /// Unconditional field update
    pub async fn patch(&self, model: &M, patch: Value) -> Result<M, ServiceError> {
        let patch = to_record(&patch)?;
        self.store
            .update(model.collection(), model.id(), patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} no longer exists", model.describe())))
            .and_then(M::from_record)
    }

    /// Applies `patch` only while `field` still holds `expected`.
    ///
    /// A lost race surfaces as `ConcurrentModification`.
    pub async fn transition<E: Serialize>(
        &self,
        model: &M,
        field: &str,
        expected: E,
        patch: Value,
    ) -> Result<M, ServiceError> {
        let expected = serde_json::to_value(expected)?;
        match self.guarded(model, field, &expected, patch).await? {
            CasOutcome::Updated(record) => M::from_record(record),
            CasOutcome::Mismatch(current) => {
                let now = current.get(field).cloned().unwrap_or(Value::Null);
                warn!(
                    "{} changed concurrently: {} is {} instead of {}",
                    model.describe(),
                    field,
                    now,
                    expected
                );
                Err(ServiceError::ConcurrentModification(format!(
                    "{} was modified concurrently ({} is now {})",
                    model.describe(),
                    field,
                    now
                )))
            }
            CasOutcome::Missing => Err(ServiceError::NotFound(format!(
                "{} no longer exists",
                model.describe()
            ))),
        }
    }

    /// Takes the single-child claim on `model`, returning the claim token.
    ///
    /// Fails with `AlreadyClaimed` if another writer holds it.
    pub async fn claim(
        &self,
        model: &M,
        claim_field: &str,
        child_kind: &str,
    ) -> Result<String, ServiceError> {
        let token = Uuid::new_v4().to_string();
        let outcome = self
            .guarded(model, claim_field, &Value::Null, json!({ claim_field: token }))
            .await?;
        match outcome {
            CasOutcome::Updated(_) => Ok(token),
            CasOutcome::Mismatch(_) => {
                warn!("Lost {} claim on {}", child_kind, model.describe());
                Err(ServiceError::AlreadyClaimed(format!(
                    "{} already has its {}",
                    model.describe(),
                    child_kind
                )))
            }
            CasOutcome::Missing => Err(ServiceError::NotFound(format!(
                "{} no longer exists",
                model.describe()
            ))),
        }
    }

    /// Releases a claim taken with [`Self::claim`]. Failures are logged, not returned.
    pub async fn release(&self, model: &M, claim_field: &str, token: &str) {
        let outcome = self
            .guarded(model, claim_field, &json!(token), json!({ claim_field: null }))
            .await;
        match outcome {
            Ok(CasOutcome::Updated(_)) => {}
            Ok(_) => warn!(
                "Claim {} on {} was not held by token {}",
                claim_field,
                model.describe(),
                token
            ),
            Err(e) => error!(
                "Failed to release claim {} on {}: {}",
                claim_field,
                model.describe(),
                e
            ),
        }
    }

    /// Removes a record written earlier in a failed operation.
    pub async fn discard(&self, model: &M) {
        if let Err(e) = self.store.delete(model.collection(), model.id()).await {
            error!("Failed to discard {}: {}", model.describe(), e);
        }
    }

    async fn guarded(
        &self,
        model: &M,
        field: &str,
        expected: &Value,
        patch: Value,
    ) -> Result<CasOutcome, ServiceError> {
        let patch = to_record(&patch)?;
        self.store
            .compare_and_update(model.collection(), model.id(), field, expected, patch)
            .await
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, ServiceError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::SerializationError(format!(
            "expected a field map, got {}",
            other
        ))),
    }
}

/// One repository per pipeline entity over a shared store.
#[derive(Clone)]
pub struct Repositories {
    pub sales_orders: Repository<SalesOrder>,
    pub breakdown_items: Repository<ItemBreakdown>,
    pub purchase_orders: Repository<PurchaseOrder>,
    pub receivings: Repository<InventoryReceiving>,
    pub inspections: Repository<QualityInspection>,
    pub shipments: Repository<DeliveryShipment>,
    pub internal_processing: Repository<InternalProcessing>,
}

impl Repositories {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            sales_orders: Repository::new(store.clone()),
            breakdown_items: Repository::new(store.clone()),
            purchase_orders: Repository::new(store.clone()),
            receivings: Repository::new(store.clone()),
            inspections: Repository::new(store.clone()),
            shipments: Repository::new(store.clone()),
            internal_processing: Repository::new(store),
        }
    }
}
