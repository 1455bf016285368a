use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{SalesOrder, SalesOrderStatus, StoredModel},
    repositories::Repository,
    store::RecordStore,
};

/// Manual forward move of a sales order, e.g. closing a completed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceSalesOrderCommand {
    pub order_id: i64,
    pub status: SalesOrderStatus,
}

#[async_trait]
impl Command for AdvanceSalesOrderCommand {
    type Result = SalesOrder;

    #[instrument(skip(self, store, event_sender), fields(order_id = self.order_id, status = %self.status))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let orders: Repository<SalesOrder> = Repository::new(store);
        let order = orders.get(self.order_id).await?;

        if order.process_status == self.status {
            debug!("Sales order already in requested status");
            return Ok(order);
        }
        // Approved orders leave `approved` only through routing.
        if order.process_status == SalesOrderStatus::Approved
            || !order.process_status.can_transition_to(self.status)
        {
            return Err(ServiceError::invalid_transition(
                order.describe(),
                order.process_status,
                self.status,
            ));
        }

        let old_status = order.process_status;
        let updated = orders
            .transition(
                &order,
                "process_status",
                old_status,
                json!({ "process_status": self.status }),
            )
            .await?;

        info!(
            order_number = %updated.order_number,
            from = %old_status,
            to = %self.status,
            "Sales order status advanced"
        );
        event_sender
            .send_or_log(Event::SalesOrderStatusChanged {
                order_id: updated.id,
                old_status,
                new_status: self.status,
            })
            .await;
        if self.status == SalesOrderStatus::Completed {
            event_sender
                .send_or_log(Event::SalesOrderCompleted(updated.id))
                .await;
        }

        Ok(updated)
    }
}
