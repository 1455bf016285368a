use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, require_text, ApprovedQuotation, QuotationStatus, SalesOrder,
        SalesOrderStatus,
    },
    repositories::Repository,
    store::{Collection, Filter, RecordStore},
};

/// Converts an approved quotation into a sales order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSalesOrderCommand {
    #[validate]
    pub quotation: ApprovedQuotation,
    /// Used when the quotation carries no currency.
    #[validate(length(equal = 3))]
    pub default_currency: String,
}

#[async_trait]
impl Command for CreateSalesOrderCommand {
    type Result = SalesOrder;

    #[instrument(skip(self, store, event_sender), fields(quotation_id = self.quotation.quotation_id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            let msg = format!("Invalid quotation: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let quotation = &self.quotation;
        if quotation.status != QuotationStatus::Approved {
            return Err(ServiceError::invalid_transition(
                format!("quotation {}", quotation.quote_number),
                quotation.status,
                "sales_order",
            ));
        }
        let customer_name = require_text(&quotation.customer_name, "customer_name")?;
        let total_amount = quotation.total_amount()?;

        let orders: Repository<SalesOrder> = Repository::new(store);
        let by_quotation = Filter::new().eq("quotation_id", quotation.quotation_id);
        if let Some(existing) = orders.find(&by_quotation).await?.first() {
            return Err(already_converted(quotation, existing));
        }

        let currency = quotation
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_currency)
            .to_uppercase();

        let order = orders
            .insert(
                Collection::SalesProcess,
                &json!({
                    "order_number": document_number("SO", Utc::now().date_naive()),
                    "quotation_id": quotation.quotation_id,
                    "quotation_number": quotation.quote_number,
                    "customer_name": customer_name,
                    "customer_company": quotation.customer_company,
                    "item_code": quotation.item_code,
                    "item_description": quotation.item_description,
                    "quantity": quotation.quantity,
                    "unit_price": quotation.unit_price,
                    "total_amount": total_amount,
                    "currency": currency,
                    "expected_delivery_date": quotation.expected_delivery_date,
                    "process_status": SalesOrderStatus::Approved,
                    "notes": quotation.notes,
                }),
            )
            .await?;

        // The quotation lives upstream and cannot carry a claim, so the lowest
        // id among concurrent conversions wins and the others withdraw.
        let converted = orders.find(&by_quotation).await?;
        if let Some(winner) = converted.first().filter(|winner| winner.id != order.id) {
            warn!(
                order_id = order.id,
                winner_id = winner.id,
                "Concurrent conversion of the same quotation; withdrawing"
            );
            orders.discard(&order).await;
            return Err(already_converted(quotation, winner));
        }

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            quantity = order.quantity,
            "Sales order created from quotation"
        );
        counter!("fulfillment_sales_orders_created_total", 1);
        event_sender
            .send_or_log(Event::SalesOrderCreated {
                order_id: order.id,
                quotation_id: order.quotation_id,
            })
            .await;

        Ok(order)
    }
}

fn already_converted(quotation: &ApprovedQuotation, existing: &SalesOrder) -> ServiceError {
    ServiceError::AlreadyClaimed(format!(
        "quotation {} was already converted to sales order {}",
        quotation.quote_number, existing.order_number
    ))
}
