use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    commands::{propagation, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{DeliveryShipment, ShipmentStatus, StoredModel},
    repositories::Repositories,
    store::RecordStore,
};

/// Moves a shipment along `preparing -> shipped -> in_transit -> delivered`,
/// or to `returned` from any live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceShipmentCommand {
    pub shipment_id: i64,
    pub status: ShipmentStatus,
}

#[async_trait]
impl Command for AdvanceShipmentCommand {
    type Result = DeliveryShipment;

    #[instrument(skip(self, store, event_sender), fields(shipment_id = self.shipment_id, status = %self.status))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let repos = Repositories::new(store);
        let shipment = repos.shipments.get(self.shipment_id).await?;

        if shipment.shipment_status == self.status {
            debug!("Shipment already in requested status");
            // Re-running completion after a delivery is harmless and lets a
            // caller recover from a propagation failure.
            if self.status == ShipmentStatus::Delivered {
                propagate_delivery(&repos, &event_sender, &shipment).await?;
            }
            return Ok(shipment);
        }
        if !shipment.shipment_status.can_transition_to(self.status) {
            return Err(ServiceError::invalid_transition(
                shipment.describe(),
                shipment.shipment_status,
                self.status,
            ));
        }

        let old_status = shipment.shipment_status;
        let delivered_at = Utc::now();
        let patch = if self.status == ShipmentStatus::Delivered {
            json!({ "shipment_status": self.status, "delivered_at": delivered_at })
        } else {
            json!({ "shipment_status": self.status })
        };
        let updated = repos
            .shipments
            .transition(&shipment, "shipment_status", old_status, patch)
            .await?;

        info!(
            shipment_number = %updated.shipment_number,
            from = %old_status,
            to = %self.status,
            "Shipment status advanced"
        );
        counter!("fulfillment_shipments_advanced_total", 1, "status" => self.status.to_string());
        event_sender
            .send_or_log(Event::ShipmentStatusChanged {
                shipment_id: updated.id,
                old_status,
                new_status: self.status,
            })
            .await;

        match self.status {
            ShipmentStatus::Delivered => {
                event_sender
                    .send_or_log(Event::ShipmentDelivered {
                        shipment_id: updated.id,
                        delivered_at,
                    })
                    .await;
                propagate_delivery(&repos, &event_sender, &updated).await?;
            }
            ShipmentStatus::Returned => {
                warn!(shipment_number = %updated.shipment_number, "Shipment returned");
            }
            _ => {}
        }

        Ok(updated)
    }
}

async fn propagate_delivery(
    repos: &Repositories,
    events: &EventSender,
    shipment: &DeliveryShipment,
) -> Result<(), ServiceError> {
    match shipment.purchase_order_id {
        Some(po_id) => {
            let po = repos.purchase_orders.get(po_id).await?;
            propagation::complete_purchase_order(repos, events, po).await
        }
        None => match shipment.sales_order_id {
            Some(order_id) => propagation::try_complete_order(repos, events, order_id)
                .await
                .map(|_| ()),
            None => Ok(()),
        },
    }
}
