use async_trait::async_trait;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        extended_total, require_text, BreakdownItemStatus, FulfillmentRoute, ItemBreakdown,
        SalesOrder, SalesOrderStatus, StoredModel,
    },
    repositories::Repositories,
    store::{Collection, Filter, RecordStore},
};

/// One requested code-identified share of an order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BreakdownLine {
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub item_description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the order's unit price.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

/// Splits an approved sales order into breakdown items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBreakdownCommand {
    pub order_id: i64,
    pub items: Vec<BreakdownLine>,
}

impl CreateBreakdownCommand {
    /// Field-level checks that need no stored state.
    fn check_lines(&self) -> Result<Vec<(String, &BreakdownLine)>, ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a breakdown needs at least one item".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(self.items.len());
        for line in &self.items {
            line.validate()?;
            let code = require_text(&line.item_code, "item_code")?;
            if !seen.insert(code.clone()) {
                return Err(ServiceError::ValidationError(format!(
                    "item code {} appears more than once",
                    code
                )));
            }
            if line.unit_price.is_some_and(|price| price.is_sign_negative()) {
                return Err(ServiceError::ValidationError(format!(
                    "unit price of item {} must not be negative",
                    code
                )));
            }
            lines.push((code, line));
        }
        Ok(lines)
    }
}

#[async_trait]
impl Command for CreateBreakdownCommand {
    type Result = Vec<ItemBreakdown>;

    #[instrument(skip(self, store, event_sender), fields(order_id = self.order_id, items = self.items.len()))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let lines = self.check_lines()?;

        let repos = Repositories::new(store);
        let order = repos.sales_orders.get(self.order_id).await?;
        if order.process_status != SalesOrderStatus::Approved {
            return Err(ServiceError::invalid_transition(
                order.describe(),
                order.process_status,
                SalesOrderStatus::Ordered,
            ));
        }

        let existing = repos
            .breakdown_items
            .find(&Filter::new().eq("sales_order_id", order.id))
            .await?;
        if !existing.is_empty() {
            return Err(ServiceError::AlreadyClaimed(format!(
                "{} already has a breakdown of {} items",
                order.describe(),
                existing.len()
            )));
        }

        let total: i64 = lines.iter().map(|(_, line)| i64::from(line.quantity)).sum();
        if total != i64::from(order.quantity) {
            return Err(ServiceError::QuantityMismatch(format!(
                "breakdown quantities sum to {} but {} has quantity {}",
                total,
                order.describe(),
                order.quantity
            )));
        }

        let priced = lines
            .iter()
            .map(|(code, line)| {
                let unit_price = line.unit_price.unwrap_or(order.unit_price);
                let line_total = extended_total(unit_price, line.quantity, "line_total")?;
                Ok::<_, ServiceError>((code, line, unit_price, line_total))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let token = repos
            .sales_orders
            .claim(&order, "routing_claim", "fulfillment route")
            .await?;

        let mut created: Vec<ItemBreakdown> = Vec::with_capacity(lines.len());
        let outcome = async {
            repos
                .sales_orders
                .patch(&order, json!({ "fulfillment_route": FulfillmentRoute::Breakdown }))
                .await?;
            for (code, line, unit_price, line_total) in &priced {
                let item = repos
                    .breakdown_items
                    .insert(
                        Collection::ProcessItemBreakdown,
                        &json!({
                            "sales_order_id": order.id,
                            "item_code": code,
                            "item_description": describe_line(line, &order),
                            "quantity": line.quantity,
                            "unit_price": unit_price,
                            "line_total": line_total,
                            "processing_type": null,
                            "internal_quantity": null,
                            "external_quantity": null,
                            "purchase_order_id": null,
                            "internal_processing_id": null,
                            "item_status": BreakdownItemStatus::Pending,
                        }),
                    )
                    .await?;
                created.push(item);
            }
            Ok::<(), ServiceError>(())
        }
        .await;

        if let Err(e) = outcome {
            error!("Breakdown of {} failed, rolling back: {}", order.describe(), e);
            for item in &created {
                repos.breakdown_items.discard(item).await;
            }
            if let Err(e) = repos
                .sales_orders
                .patch(&order, json!({ "fulfillment_route": null }))
                .await
            {
                error!("Failed to clear route of {}: {}", order.describe(), e);
            }
            repos
                .sales_orders
                .release(&order, "routing_claim", &token)
                .await;
            return Err(e);
        }

        info!(
            order_number = %order.order_number,
            items = created.len(),
            "Sales order split into breakdown items"
        );
        counter!("fulfillment_breakdown_items_created_total", created.len() as u64);
        event_sender
            .send_or_log(Event::BreakdownCreated {
                order_id: order.id,
                item_ids: created.iter().map(|item| item.id).collect(),
            })
            .await;

        Ok(created)
    }
}

fn describe_line(line: &BreakdownLine, order: &SalesOrder) -> String {
    let description = line.item_description.trim();
    if description.is_empty() {
        order.item_description.clone()
    } else {
        description.to_string()
    }
}
