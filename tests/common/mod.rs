#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use fulfillment_pipeline::{
    app_router,
    commands::{
        quality::RecordInspectionCommand, receiving::RecordReceivingCommand,
        shipments::CreateShipmentCommand,
    },
    config::AppConfig,
    events::{Event, EventSender},
    handlers::AppServices,
    models::{
        ApprovedQuotation, DeliveryShipment, InspectionMethod, InventoryReceiving,
        QualityInspection, QuotationStatus, ShipmentStatus,
    },
    store::{InMemoryRecordStore, RecordStore},
    AppState,
};

/// Services over a fresh in-memory store, with the event stream captured.
pub struct TestPipeline {
    pub store: Arc<InMemoryRecordStore>,
    pub services: AppServices,
    pub state: AppState,
    pub events: mpsc::Receiver<Event>,
}

impl TestPipeline {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        Self::with_store(store)
    }

    pub fn with_store(store: Arc<InMemoryRecordStore>) -> Self {
        let (sender, events) = EventSender::channel(1024);
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let state = AppState::new(dyn_store, AppConfig::default(), Arc::new(sender));
        Self {
            store,
            services: state.services.clone(),
            state,
            events,
        }
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    /// Events emitted so far, in order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Receives the full purchase order quantity at `WH-A`.
    pub async fn receive(&self, purchase_order_id: i64, quantity: i32) -> InventoryReceiving {
        self.services
            .receiving
            .record_receiving(receiving_command(purchase_order_id, quantity))
            .await
            .expect("receiving recorded")
            .receiving
    }

    pub async fn inspect(
        &self,
        receiving_id: i64,
        approved: i32,
        rejected: i32,
    ) -> QualityInspection {
        self.services
            .inspections
            .record_inspection(inspection_command(receiving_id, approved, rejected))
            .await
            .expect("inspection recorded")
    }

    pub async fn ship(&self, inspection_id: i64, quantity: i32) -> DeliveryShipment {
        self.services
            .shipments
            .create_shipment(shipment_command(inspection_id, quantity))
            .await
            .expect("shipment created")
    }

    /// Walks a shipment through every live status to `delivered`.
    pub async fn deliver(&self, shipment_id: i64) -> DeliveryShipment {
        let mut shipment = None;
        for status in [
            ShipmentStatus::Shipped,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
        ] {
            shipment = Some(
                self.services
                    .shipments
                    .advance_status(shipment_id, status)
                    .await
                    .expect("shipment advanced"),
            );
        }
        shipment.expect("at least one status applied")
    }

    /// Receive, inspect with no rejections, ship and deliver one purchase order.
    pub async fn fulfil_purchase_order(&self, purchase_order_id: i64, quantity: i32) {
        let receiving = self.receive(purchase_order_id, quantity).await;
        let inspection = self.inspect(receiving.id, quantity, 0).await;
        let shipment = self.ship(inspection.id, quantity).await;
        self.deliver(shipment.id).await;
    }
}

pub fn quotation(quotation_id: i64, quantity: i32) -> ApprovedQuotation {
    ApprovedQuotation {
        quotation_id,
        quote_number: format!("QT-{:05}", quotation_id),
        status: QuotationStatus::Approved,
        customer_name: "Harbor Fabrication".to_string(),
        customer_company: Some("Harbor Fabrication Ltd".to_string()),
        item_code: Some("ASSY-100".to_string()),
        item_description: "Mounting bracket assembly".to_string(),
        quantity,
        unit_price: dec!(12.50),
        currency: None,
        expected_delivery_date: None,
        notes: None,
    }
}

pub fn receiving_command(purchase_order_id: i64, quantity: i32) -> RecordReceivingCommand {
    RecordReceivingCommand {
        purchase_order_id,
        received_quantity: quantity,
        warehouse_location: "WH-A".to_string(),
        received_by: Some("dock-1".to_string()),
        received_date: None,
        condition_notes: None,
    }
}

pub fn inspection_command(
    receiving_id: i64,
    approved: i32,
    rejected: i32,
) -> RecordInspectionCommand {
    RecordInspectionCommand {
        receiving_id,
        approved_quantity: approved,
        rejected_quantity: rejected,
        method: InspectionMethod::Sample,
        approved_for_shipment: approved > 0,
        inspector: Some("qa-lead".to_string()),
        inspection_date: None,
        notes: None,
    }
}

pub fn shipment_command(inspection_id: i64, quantity: i32) -> CreateShipmentCommand {
    CreateShipmentCommand {
        inspection_id,
        shipment_quantity: quantity,
        shipped_by: Some("outbound-2".to_string()),
        shipment_date: None,
        delivery_method: Some("freight".to_string()),
        delivery_address: Some("12 Quay Road, Port Town".to_string()),
        delivery_contact: None,
        tracking_number: None,
    }
}

/// Sends one request through the router and returns status and JSON body.
pub async fn send_json(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response = router.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}
