use crate::{
    commands::{quality::RecordInspectionCommand, Command},
    errors::ServiceError,
    events::EventSender,
    models::QualityInspection,
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Service for the quality gate between receiving and shipment
#[derive(Clone)]
pub struct InspectionService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
}

impl InspectionService {
    pub fn new(store: Arc<dyn RecordStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            repos: Repositories::new(store.clone()),
            store,
            event_sender,
        }
    }

    #[instrument(skip(self, command), fields(receiving_id = command.receiving_id))]
    pub async fn record_inspection(
        &self,
        command: RecordInspectionCommand,
    ) -> Result<QualityInspection, ServiceError> {
        command
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_inspection(&self, id: i64) -> Result<QualityInspection, ServiceError> {
        self.repos.inspections.get(id).await
    }

    /// Inspections approved for shipment that have no shipment yet
    #[instrument(skip(self))]
    pub async fn shippable_inspections(&self) -> Result<Vec<QualityInspection>, ServiceError> {
        let filter = Filter::new()
            .eq("approved_for_shipment", true)
            .eq("shipment_claim", Value::Null);
        let inspections = self.repos.inspections.find(&filter).await?;
        Ok(inspections
            .into_iter()
            .filter(QualityInspection::is_shippable)
            .collect())
    }
}
