use crate::{
    commands::{
        shipments::{AdvanceShipmentCommand, CreateShipmentCommand},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{DeliveryShipment, ShipmentStatus},
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use std::sync::Arc;
use tracing::instrument;

/// Service for managing shipments
#[derive(Clone)]
pub struct ShipmentService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
}

impl ShipmentService {
    /// Creates a new shipment service instance
    pub fn new(store: Arc<dyn RecordStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            repos: Repositories::new(store.clone()),
            store,
            event_sender,
        }
    }

    /// Creates a new shipment
    #[instrument(skip(self, command), fields(inspection_id = command.inspection_id))]
    pub async fn create_shipment(
        &self,
        command: CreateShipmentCommand,
    ) -> Result<DeliveryShipment, ServiceError> {
        command
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a shipment by ID
    #[instrument(skip(self))]
    pub async fn get_shipment(&self, id: i64) -> Result<DeliveryShipment, ServiceError> {
        self.repos.shipments.get(id).await
    }

    /// Shipments of one sales order
    #[instrument(skip(self))]
    pub async fn shipments_for_order(
        &self,
        order_id: i64,
    ) -> Result<Vec<DeliveryShipment>, ServiceError> {
        self.repos
            .shipments
            .find(&Filter::new().eq("sales_order_id", order_id))
            .await
    }

    /// Advances a shipment; delivery completes its purchase order and order
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        shipment_id: i64,
        status: ShipmentStatus,
    ) -> Result<DeliveryShipment, ServiceError> {
        AdvanceShipmentCommand {
            shipment_id,
            status,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }
}
