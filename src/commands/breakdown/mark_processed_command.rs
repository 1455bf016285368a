use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    commands::{propagation, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{BreakdownItemStatus, ItemBreakdown, PurchaseOrderStatus, StoredModel},
    repositories::Repositories,
    store::RecordStore,
};

/// `stock_checked -> processed` once every assigned unit has its record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkProcessedCommand {
    pub item_id: i64,
}

#[async_trait]
impl Command for MarkProcessedCommand {
    type Result = ItemBreakdown;

    #[instrument(skip(self, store, event_sender), fields(item_id = self.item_id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let repos = Repositories::new(store);
        let item = repos.breakdown_items.get(self.item_id).await?;

        if item.item_status != BreakdownItemStatus::StockChecked {
            return Err(ServiceError::invalid_transition(
                item.describe(),
                item.item_status,
                BreakdownItemStatus::Processed,
            ));
        }

        if !item.units_recorded() {
            return Err(ServiceError::missing_field(format!(
                "downstream records for the {} internal and {} external units of {}",
                item.internal_quantity.unwrap_or_default(),
                item.external_quantity.unwrap_or_default(),
                item.describe()
            )));
        }
        let purchase_order = match item.purchase_order_id.filter(|_| item.needs_procurement()) {
            Some(po_id) => Some(repos.purchase_orders.get(po_id).await?),
            None => None,
        };
        if let Some(id) = item
            .internal_processing_id
            .filter(|_| item.internal_quantity.unwrap_or(0) > 0)
        {
            repos.internal_processing.get(id).await?;
        }

        let processed = repos
            .breakdown_items
            .transition(
                &item,
                "item_status",
                BreakdownItemStatus::StockChecked,
                json!({ "item_status": BreakdownItemStatus::Processed }),
            )
            .await?;

        info!(item_code = %processed.item_code, "Breakdown item processed");
        event_sender
            .send_or_log(Event::BreakdownItemStatusChanged {
                item_id: processed.id,
                old_status: BreakdownItemStatus::StockChecked,
                new_status: BreakdownItemStatus::Processed,
            })
            .await;

        // Nothing left to wait for: stock-only items, or a purchase order
        // that was already completed.
        let fulfilled = purchase_order
            .as_ref()
            .map_or(true, |po| po.status == PurchaseOrderStatus::Completed);
        if fulfilled {
            propagation::complete_item(&repos, &event_sender, &processed).await?;
            return repos.breakdown_items.get(processed.id).await;
        }

        Ok(processed)
    }
}
