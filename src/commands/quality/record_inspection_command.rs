use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, require_some_text, InspectionMethod, InspectionResult,
        InventoryReceiving, PurchaseType, QualityInspection, SalesOrderStatus, StoredModel,
    },
    repositories::Repositories,
    store::{Collection, RecordStore},
};

/// Splits a receiving's quantity into approved and rejected units.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordInspectionCommand {
    #[serde(default)]
    pub receiving_id: i64,
    #[validate(range(min = 0))]
    pub approved_quantity: i32,
    #[validate(range(min = 0))]
    pub rejected_quantity: i32,
    pub method: InspectionMethod,
    pub approved_for_shipment: bool,
    #[serde(default)]
    pub inspector: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[async_trait]
impl Command for RecordInspectionCommand {
    type Result = QualityInspection;

    #[instrument(skip(self, store, event_sender), fields(receiving_id = self.receiving_id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let inspector = require_some_text(self.inspector.as_deref(), "inspector")?;
        if self.approved_for_shipment && self.approved_quantity == 0 {
            return Err(ServiceError::ValidationError(
                "an inspection with no approved units cannot be approved for shipment".to_string(),
            ));
        }

        let repos = Repositories::new(store);
        let receiving = repos.receivings.get(self.receiving_id).await?;

        if receiving.is_inspected() {
            return Err(ServiceError::AlreadyClaimed(format!(
                "{} already has an inspection",
                receiving.describe()
            )));
        }

        let total = i64::from(self.approved_quantity) + i64::from(self.rejected_quantity);
        if total != i64::from(receiving.received_quantity) {
            return Err(ServiceError::QuantityMismatch(format!(
                "approved {} + rejected {} does not equal the {} units received on {}",
                self.approved_quantity,
                self.rejected_quantity,
                receiving.received_quantity,
                receiving.describe()
            )));
        }

        let result = InspectionResult::derive(self.approved_quantity, self.rejected_quantity);
        let token = repos
            .receivings
            .claim(&receiving, "inspection_claim", "inspection")
            .await?;

        let written = write_inspection(&repos, self, &receiving, &inspector, result).await;
        let inspection = match written {
            Ok(inspection) => inspection,
            Err(e) => {
                error!("Inspection of {} failed: {}", receiving.describe(), e);
                repos
                    .receivings
                    .release(&receiving, "inspection_claim", &token)
                    .await;
                return Err(e);
            }
        };

        if self.rejected_quantity > 0 {
            warn!(
                inspection_number = %inspection.inspection_number,
                rejected = self.rejected_quantity,
                "Inspection rejected units"
            );
        }
        info!(
            inspection_number = %inspection.inspection_number,
            result = %result,
            approved = self.approved_quantity,
            approved_for_shipment = self.approved_for_shipment,
            "Inspection recorded"
        );
        counter!("fulfillment_inspections_recorded_total", 1, "result" => result.to_string());
        event_sender
            .send_or_log(Event::InspectionRecorded {
                inspection_id: inspection.id,
                receiving_id: receiving.id,
                approved_quantity: inspection.approved_quantity,
                rejected_quantity: inspection.rejected_quantity,
                approved_for_shipment: inspection.approved_for_shipment,
            })
            .await;

        if inspection.approved_for_shipment {
            advance_direct_order(&repos, &event_sender, &receiving).await?;
        }

        Ok(inspection)
    }
}

async fn write_inspection(
    repos: &Repositories,
    command: &RecordInspectionCommand,
    receiving: &InventoryReceiving,
    inspector: &str,
    result: InspectionResult,
) -> Result<QualityInspection, ServiceError> {
    let inspection = repos
        .inspections
        .insert(
            Collection::QualityInspection,
            &json!({
                "inspection_number": document_number("QI", Utc::now().date_naive()),
                "receiving_id": receiving.id,
                "purchase_order_id": receiving.purchase_order_id,
                "sales_order_id": receiving.sales_order_id,
                "inspector": inspector,
                "inspection_date": command.inspection_date.unwrap_or_else(|| Utc::now().date_naive()),
                "method": command.method,
                "total_quantity": receiving.received_quantity,
                "approved_quantity": command.approved_quantity,
                "rejected_quantity": command.rejected_quantity,
                "inspection_result": result,
                "approved_for_shipment": command.approved_for_shipment,
                "notes": command.notes,
            }),
        )
        .await?;

    if let Err(e) = repos
        .receivings
        .patch(receiving, json!({ "inspection_id": inspection.id }))
        .await
    {
        repos.inspections.discard(&inspection).await;
        return Err(e);
    }
    Ok(inspection)
}

/// Approved goods for a direct customer purchase move the order to `received`.
async fn advance_direct_order(
    repos: &Repositories,
    events: &EventSender,
    receiving: &InventoryReceiving,
) -> Result<(), ServiceError> {
    let Some(po_id) = receiving.purchase_order_id else {
        return Ok(());
    };
    let po = repos.purchase_orders.get(po_id).await?;
    let Some(order_id) = po.sales_order_id else {
        return Ok(());
    };
    if po.purchase_type != PurchaseType::CustomerOrder {
        return Ok(());
    }

    let order = repos.sales_orders.get(order_id).await?;
    if order.process_status != SalesOrderStatus::ExternalOrdered {
        debug!(order_id, status = %order.process_status, "Order already past external_ordered");
        return Ok(());
    }
    match repos
        .sales_orders
        .transition(
            &order,
            "process_status",
            SalesOrderStatus::ExternalOrdered,
            json!({ "process_status": SalesOrderStatus::Received }),
        )
        .await
    {
        Ok(_) => {
            info!(order_number = %order.order_number, "Sales order goods received and approved");
            events
                .send_or_log(Event::SalesOrderStatusChanged {
                    order_id,
                    old_status: SalesOrderStatus::ExternalOrdered,
                    new_status: SalesOrderStatus::Received,
                })
                .await;
            Ok(())
        }
        Err(ServiceError::ConcurrentModification(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
