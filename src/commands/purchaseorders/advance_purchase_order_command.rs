use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    commands::{propagation, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{PurchaseOrder, PurchaseOrderStatus, StoredModel},
    repositories::Repositories,
    store::RecordStore,
};

/// Moves a purchase order to the next status in its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancePurchaseOrderCommand {
    pub purchase_order_id: i64,
    pub status: PurchaseOrderStatus,
}

#[async_trait]
impl Command for AdvancePurchaseOrderCommand {
    type Result = PurchaseOrder;

    #[instrument(skip(self, store, event_sender), fields(purchase_order_id = self.purchase_order_id, status = %self.status))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let repos = Repositories::new(store);
        let po = repos.purchase_orders.get(self.purchase_order_id).await?;

        if po.status == self.status {
            debug!("Purchase order already in requested status");
            return Ok(po);
        }
        if !po.status.can_transition_to(self.status) {
            return Err(ServiceError::invalid_transition(
                po.describe(),
                po.status,
                self.status,
            ));
        }

        let old_status = po.status;
        let updated = repos
            .purchase_orders
            .transition(&po, "status", old_status, json!({ "status": self.status }))
            .await?;

        info!(
            po_number = %updated.po_number,
            from = %old_status,
            to = %self.status,
            "Purchase order status advanced"
        );
        counter!("fulfillment_purchase_orders_advanced_total", 1, "status" => self.status.to_string());
        event_sender
            .send_or_log(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status,
                new_status: self.status,
            })
            .await;

        if updated.status == PurchaseOrderStatus::Completed {
            propagation::on_purchase_order_completed(&repos, &event_sender, &updated).await?;
        }

        Ok(updated)
    }
}
