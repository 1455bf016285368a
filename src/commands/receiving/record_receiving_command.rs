use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, receiving::discrepancy_note, require_some_text, require_text,
        InventoryReceiving, PurchaseOrder, PurchaseOrderStatus, StoredModel,
    },
    repositories::{Repositories, Repository},
    store::{Collection, RecordStore},
};

const MAX_STATUS_ATTEMPTS: usize = 4;

/// Records the physical arrival of goods against a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordReceivingCommand {
    pub purchase_order_id: i64,
    #[validate(range(min = 1))]
    pub received_quantity: i32,
    #[serde(default)]
    pub warehouse_location: String,
    #[serde(default)]
    pub received_by: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    pub condition_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordReceivingResult {
    pub receiving: InventoryReceiving,
    pub purchase_order: PurchaseOrder,
}

#[async_trait]
impl Command for RecordReceivingCommand {
    type Result = RecordReceivingResult;

    #[instrument(skip(self, store, event_sender), fields(purchase_order_id = self.purchase_order_id, quantity = self.received_quantity))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let location = require_text(&self.warehouse_location, "warehouse_location")?;
        let received_by = require_some_text(self.received_by.as_deref(), "received_by")?;

        let repos = Repositories::new(store);
        let po = repos.purchase_orders.get(self.purchase_order_id).await?;

        if !po.status.accepts_receiving() {
            return Err(ServiceError::invalid_transition(
                po.describe(),
                po.status,
                PurchaseOrderStatus::Received,
            ));
        }
        if po.is_received() {
            return Err(ServiceError::AlreadyClaimed(format!(
                "{} already has a receiving",
                po.describe()
            )));
        }

        let discrepancy = discrepancy_note(self.received_quantity, po.quantity);
        if let Some(note) = &discrepancy {
            warn!(po_number = %po.po_number, "{}", note);
        }
        let condition_notes = match (self.condition_notes.as_deref().map(str::trim), discrepancy) {
            (Some(notes), Some(note)) if !notes.is_empty() => Some(format!("{}\n{}", notes, note)),
            (_, Some(note)) => Some(note),
            (notes, None) => notes.filter(|n| !n.is_empty()).map(str::to_string),
        };

        let token = repos
            .purchase_orders
            .claim(&po, "receiving_claim", "receiving")
            .await?;

        let receiving = match repos
            .receivings
            .insert(
                Collection::InventoryReceiving,
                &json!({
                    "receiving_number": document_number("RCV", Utc::now().date_naive()),
                    "purchase_order_id": po.id,
                    "sales_order_id": po.sales_order_id,
                    "breakdown_item_id": po.breakdown_item_id,
                    "received_date": self.received_date.unwrap_or_else(|| Utc::now().date_naive()),
                    "received_by": received_by,
                    "received_quantity": self.received_quantity,
                    "expected_quantity": po.quantity,
                    "warehouse_location": location,
                    "condition_notes": condition_notes,
                }),
            )
            .await
        {
            Ok(receiving) => receiving,
            Err(e) => {
                repos.purchase_orders.release(&po, "receiving_claim", &token).await;
                return Err(e);
            }
        };

        let (purchase_order, old_status) =
            match mark_received(&repos.purchase_orders, po.id, receiving.id).await {
                Ok(updated) => updated,
                Err(e) => {
                    error!("Failed to mark {} received: {}", po.describe(), e);
                    repos.receivings.discard(&receiving).await;
                    repos.purchase_orders.release(&po, "receiving_claim", &token).await;
                    return Err(e);
                }
            };

        info!(
            receiving_number = %receiving.receiving_number,
            po_number = %purchase_order.po_number,
            received = receiving.received_quantity,
            expected = po.quantity,
            "Goods received"
        );
        counter!("fulfillment_receivings_recorded_total", 1);
        event_sender
            .send_or_log(Event::GoodsReceived {
                receiving_id: receiving.id,
                purchase_order_id: receiving.purchase_order_id,
                quantity: receiving.received_quantity,
                discrepancy: receiving.discrepancy(),
            })
            .await;
        if old_status != PurchaseOrderStatus::Received {
            event_sender
                .send_or_log(Event::PurchaseOrderStatusChanged {
                    purchase_order_id: purchase_order.id,
                    old_status,
                    new_status: PurchaseOrderStatus::Received,
                })
                .await;
        }

        Ok(RecordReceivingResult {
            receiving,
            purchase_order,
        })
    }
}

/// Links the receiving and drives the order forward to `received`, from
/// whatever earlier status it is in. Returns the updated order and the status
/// it left.
async fn mark_received(
    purchase_orders: &Repository<PurchaseOrder>,
    po_id: i64,
    receiving_id: i64,
) -> Result<(PurchaseOrder, PurchaseOrderStatus), ServiceError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let current = purchase_orders.get(po_id).await?;
        let old_status = current.status;
        let patch = if old_status < PurchaseOrderStatus::Received {
            json!({ "receiving_id": receiving_id, "status": PurchaseOrderStatus::Received })
        } else {
            json!({ "receiving_id": receiving_id })
        };
        match purchase_orders
            .transition(&current, "status", old_status, patch)
            .await
        {
            Ok(updated) => return Ok((updated, old_status)),
            Err(ServiceError::ConcurrentModification(_)) if attempt < MAX_STATUS_ATTEMPTS => {
                continue
            }
            Err(e) => return Err(e),
        }
    }
}
