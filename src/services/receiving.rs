use crate::{
    commands::{
        receiving::{RecordReceivingCommand, RecordReceivingResult},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::InventoryReceiving,
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Service for goods arrival
#[derive(Clone)]
pub struct ReceivingService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
}

impl ReceivingService {
    pub fn new(store: Arc<dyn RecordStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            repos: Repositories::new(store.clone()),
            store,
            event_sender,
        }
    }

    /// Records a receiving and advances its purchase order to `received`
    #[instrument(skip(self, command), fields(purchase_order_id = command.purchase_order_id))]
    pub async fn record_receiving(
        &self,
        command: RecordReceivingCommand,
    ) -> Result<RecordReceivingResult, ServiceError> {
        command
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_receiving(&self, id: i64) -> Result<InventoryReceiving, ServiceError> {
        self.repos.receivings.get(id).await
    }

    /// Receivings still waiting for their inspection
    #[instrument(skip(self))]
    pub async fn inspectable_receivings(&self) -> Result<Vec<InventoryReceiving>, ServiceError> {
        self.repos
            .receivings
            .find(&Filter::new().eq("inspection_claim", Value::Null))
            .await
    }
}
