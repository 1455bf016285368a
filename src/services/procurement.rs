use crate::{
    commands::{
        purchaseorders::{AdvancePurchaseOrderCommand, CreateReplenishmentOrderCommand},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{PurchaseOrder, PurchaseOrderStatus, PurchaseType},
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Service for managing purchase orders
#[derive(Clone)]
pub struct ProcurementService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
    default_currency: String,
}

impl ProcurementService {
    /// Creates a new procurement service instance
    pub fn new(
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            repos: Repositories::new(store.clone()),
            store,
            event_sender,
            default_currency: default_currency.into(),
        }
    }

    /// Creates an inventory replenishment purchase order
    #[instrument(skip(self, command))]
    pub async fn create_replenishment_order(
        &self,
        mut command: CreateReplenishmentOrderCommand,
    ) -> Result<PurchaseOrder, ServiceError> {
        if command
            .currency
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
        {
            command.currency = Some(self.default_currency.clone());
        }
        command
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a purchase order by ID from either purchase order collection
    #[instrument(skip(self))]
    pub async fn get_purchase_order(&self, id: i64) -> Result<PurchaseOrder, ServiceError> {
        self.repos.purchase_orders.get(id).await
    }

    /// Lists purchase orders, optionally filtered
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
        purchase_type: Option<PurchaseType>,
        sales_order_id: Option<i64>,
    ) -> Result<Vec<PurchaseOrder>, ServiceError> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.eq("status", status.to_string());
        }
        if let Some(order_id) = sales_order_id {
            filter = filter.eq("sales_order_id", order_id);
        }
        match purchase_type {
            Some(purchase_type) => {
                let filter = filter.eq("purchase_type", purchase_type.to_string());
                self.repos
                    .purchase_orders
                    .find_in(purchase_type.collection(), &filter)
                    .await
            }
            None => self.repos.purchase_orders.find(&filter).await,
        }
    }

    /// Purchase orders that may still receive goods: no receiving yet and
    /// not completed
    #[instrument(skip(self))]
    pub async fn receivable_purchase_orders(&self) -> Result<Vec<PurchaseOrder>, ServiceError> {
        let orders = self
            .repos
            .purchase_orders
            .find(&Filter::new().eq("receiving_claim", serde_json::Value::Null))
            .await?;
        let receivable: Vec<PurchaseOrder> = orders
            .into_iter()
            .filter(|po| po.status.accepts_receiving())
            .collect();
        info!(count = receivable.len(), "Receivable purchase orders listed");
        Ok(receivable)
    }

    /// Advances a purchase order to the next status
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        purchase_order_id: i64,
        status: PurchaseOrderStatus,
    ) -> Result<PurchaseOrder, ServiceError> {
        AdvancePurchaseOrderCommand {
            purchase_order_id,
            status,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }
}
