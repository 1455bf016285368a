use crate::{
    commands::{
        breakdown::{
            AssignProcessingCommand, AssignProcessingResult, BreakdownLine, CreateBreakdownCommand,
            MarkProcessedCommand,
        },
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::ItemBreakdown,
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use std::sync::Arc;
use tracing::instrument;

/// Service for per-code order splitting
#[derive(Clone)]
pub struct BreakdownService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
}

impl BreakdownService {
    pub fn new(store: Arc<dyn RecordStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            repos: Repositories::new(store.clone()),
            store,
            event_sender,
        }
    }

    /// Splits an approved order into breakdown items
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_breakdown(
        &self,
        order_id: i64,
        items: Vec<BreakdownLine>,
    ) -> Result<Vec<ItemBreakdown>, ServiceError> {
        CreateBreakdownCommand { order_id, items }
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    /// Breakdown items of one order, ordered by id
    #[instrument(skip(self))]
    pub async fn items_for_order(&self, order_id: i64) -> Result<Vec<ItemBreakdown>, ServiceError> {
        self.repos.sales_orders.get(order_id).await?;
        self.repos
            .breakdown_items
            .find(&Filter::new().eq("sales_order_id", order_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i64) -> Result<ItemBreakdown, ServiceError> {
        self.repos.breakdown_items.get(item_id).await
    }

    /// Splits one item between stock and purchase
    #[instrument(skip(self, command), fields(item_id = command.item_id))]
    pub async fn assign_processing(
        &self,
        command: AssignProcessingCommand,
    ) -> Result<AssignProcessingResult, ServiceError> {
        command
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_processed(&self, item_id: i64) -> Result<ItemBreakdown, ServiceError> {
        MarkProcessedCommand { item_id }
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }
}
