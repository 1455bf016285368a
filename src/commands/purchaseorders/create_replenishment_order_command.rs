use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, extended_total, require_some_text, require_text, PurchaseOrder,
        PurchaseOrderStatus, PurchaseType,
    },
    repositories::Repository,
    store::RecordStore,
};

/// Stock replenishment purchase with no sales order behind it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReplenishmentOrderCommand {
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub supplier_contact: Option<String>,
    #[serde(default)]
    pub item_code: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub item_description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_cost: Decimal,
    /// The service fills in the configured default when omitted.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub expected_arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateReplenishmentOrderCommand {
    fn currency(&self) -> Result<String, ServiceError> {
        let currency = require_some_text(self.currency.as_deref(), "currency")?.to_uppercase();
        if currency.len() != 3 {
            return Err(ServiceError::ValidationError(format!(
                "currency {} is not a three-letter code",
                currency
            )));
        }
        Ok(currency)
    }
}

#[async_trait]
impl Command for CreateReplenishmentOrderCommand {
    type Result = PurchaseOrder;

    #[instrument(skip(self, store, event_sender))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let command = self;
        command.validate()?;
        let supplier_name = require_some_text(command.supplier_name.as_deref(), "supplier_name")?;
        let description = require_text(&command.item_description, "item_description")?;
        if command.unit_cost.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "unit_cost must not be negative".to_string(),
            ));
        }
        let currency = command.currency()?;
        let total_cost = extended_total(command.unit_cost, command.quantity, "total_cost")?;

        let purchase_orders: Repository<PurchaseOrder> = Repository::new(store);
        let today = Utc::now().date_naive();
        let po = purchase_orders
            .insert(
                PurchaseType::InventoryReplenishment.collection(),
                &json!({
                    "po_number": document_number("PO", today),
                    "purchase_type": PurchaseType::InventoryReplenishment,
                    "sales_order_id": null,
                    "breakdown_item_id": null,
                    "supplier_name": supplier_name,
                    "supplier_contact": command.supplier_contact,
                    "item_code": command.item_code,
                    "item_description": description,
                    "quantity": command.quantity,
                    "unit_cost": command.unit_cost,
                    "total_cost": total_cost,
                    "currency": currency,
                    "order_date": today,
                    "expected_arrival_date": command.expected_arrival_date,
                    "status": PurchaseOrderStatus::Ordered,
                    "notes": command.notes,
                }),
            )
            .await?;

        info!(
            purchase_order_id = po.id,
            po_number = %po.po_number,
            quantity = po.quantity,
            "Replenishment purchase order created"
        );
        counter!("fulfillment_purchase_orders_created_total", 1, "purchase_type" => "inventory_replenishment");
        event_sender
            .send_or_log(Event::PurchaseOrderCreated {
                purchase_order_id: po.id,
                purchase_type: po.purchase_type,
                quantity: po.quantity,
            })
            .await;

        Ok(po)
    }
}
