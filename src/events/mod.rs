use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::models::{
    BreakdownItemStatus, ProcessingType, PurchaseOrderStatus, PurchaseType, SalesOrderStatus,
    ShipmentStatus,
};

/// Domain events emitted by the fulfillment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Sales order events
    SalesOrderCreated {
        order_id: i64,
        quotation_id: Option<i64>,
    },
    SalesOrderRouted {
        order_id: i64,
        strategy: String,
    },
    SalesOrderStatusChanged {
        order_id: i64,
        old_status: SalesOrderStatus,
        new_status: SalesOrderStatus,
    },
    SalesOrderCompleted(i64),

    // Breakdown events
    BreakdownCreated {
        order_id: i64,
        item_ids: Vec<i64>,
    },
    BreakdownItemAssigned {
        item_id: i64,
        processing_type: ProcessingType,
        internal_quantity: i32,
        external_quantity: i32,
    },
    BreakdownItemStatusChanged {
        item_id: i64,
        old_status: BreakdownItemStatus,
        new_status: BreakdownItemStatus,
    },

    // Procurement events
    PurchaseOrderCreated {
        purchase_order_id: i64,
        purchase_type: PurchaseType,
        quantity: i32,
    },
    PurchaseOrderStatusChanged {
        purchase_order_id: i64,
        old_status: PurchaseOrderStatus,
        new_status: PurchaseOrderStatus,
    },
    InternalProcessingRecorded {
        processing_id: i64,
        order_id: i64,
        quantity: i32,
    },

    // Receiving and inspection events
    GoodsReceived {
        receiving_id: i64,
        purchase_order_id: Option<i64>,
        quantity: i32,
        discrepancy: Option<i32>,
    },
    InspectionRecorded {
        inspection_id: i64,
        receiving_id: i64,
        approved_quantity: i32,
        rejected_quantity: i32,
        approved_for_shipment: bool,
    },

    // Shipment events
    ShipmentCreated {
        shipment_id: i64,
        inspection_id: i64,
        quantity: i32,
    },
    ShipmentStatusChanged {
        shipment_id: i64,
        old_status: ShipmentStatus,
        new_status: ShipmentStatus,
    },
    ShipmentDelivered {
        shipment_id: i64,
        delivered_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SalesOrderCreated { .. } => "sales_order_created",
            Event::SalesOrderRouted { .. } => "sales_order_routed",
            Event::SalesOrderStatusChanged { .. } => "sales_order_status_changed",
            Event::SalesOrderCompleted(_) => "sales_order_completed",
            Event::BreakdownCreated { .. } => "breakdown_created",
            Event::BreakdownItemAssigned { .. } => "breakdown_item_assigned",
            Event::BreakdownItemStatusChanged { .. } => "breakdown_item_status_changed",
            Event::PurchaseOrderCreated { .. } => "purchase_order_created",
            Event::PurchaseOrderStatusChanged { .. } => "purchase_order_status_changed",
            Event::InternalProcessingRecorded { .. } => "internal_processing_recorded",
            Event::GoodsReceived { .. } => "goods_received",
            Event::InspectionRecorded { .. } => "inspection_recorded",
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::ShipmentStatusChanged { .. } => "shipment_status_changed",
            Event::ShipmentDelivered { .. } => "shipment_delivered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Bounded channel plus the sender wrapping it
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event; a closed or full channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.sender.try_send(event) {
            warn!(event = name, "Dropping domain event: {}", e);
            counter!("fulfillment_events_dropped_total", 1, "event" => name);
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("fulfillment_events_total", 1, "event" => event.name());

        match &event {
            Event::SalesOrderCompleted(order_id) => {
                info!(order_id, "Sales order fulfilled");
            }
            Event::GoodsReceived {
                receiving_id,
                discrepancy: Some(delta),
                ..
            } => {
                warn!(receiving_id, delta, "Goods received with quantity discrepancy");
            }
            Event::InspectionRecorded {
                inspection_id,
                rejected_quantity,
                ..
            } if *rejected_quantity > 0 => {
                warn!(inspection_id, rejected_quantity, "Inspection rejected goods");
            }
            Event::ShipmentStatusChanged {
                shipment_id,
                new_status: ShipmentStatus::Returned,
                ..
            } => {
                warn!(shipment_id, "Shipment returned");
            }
            _ => {
                debug!("Received event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        sender.send_or_log(Event::SalesOrderCompleted(1)).await;
        assert!(sender.send(Event::SalesOrderCompleted(1)).await.is_err());
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        sender.send_or_log(Event::SalesOrderCompleted(1)).await;
        sender
            .send(Event::SalesOrderRouted {
                order_id: 2,
                strategy: "external".into(),
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Event::SalesOrderCompleted(1)));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("sales_order_routed"));
    }
}
