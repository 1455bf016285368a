use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, require_some_text, DeliveryShipment, QualityInspection, ShipmentStatus,
        StoredModel,
    },
    repositories::Repositories,
    store::{Collection, RecordStore},
};

/// Ships approved units of one inspection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateShipmentCommand {
    #[serde(default)]
    pub inspection_id: i64,
    #[validate(range(min = 1))]
    pub shipment_quantity: i32,
    #[serde(default)]
    pub shipped_by: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub shipment_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub delivery_method: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_contact: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[async_trait]
impl Command for CreateShipmentCommand {
    type Result = DeliveryShipment;

    #[instrument(skip(self, store, event_sender), fields(inspection_id = self.inspection_id, quantity = self.shipment_quantity))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let shipped_by = require_some_text(self.shipped_by.as_deref(), "shipped_by")?;

        let repos = Repositories::new(store);
        let inspection = repos.inspections.get(self.inspection_id).await?;

        if !inspection.approved_for_shipment {
            return Err(ServiceError::invalid_transition(
                inspection.describe(),
                format!("{} (not approved for shipment)", inspection.inspection_result),
                ShipmentStatus::Preparing,
            ));
        }
        if inspection.is_shipped() {
            return Err(ServiceError::AlreadyClaimed(format!(
                "{} already has a shipment",
                inspection.describe()
            )));
        }
        if self.shipment_quantity > inspection.approved_quantity {
            return Err(ServiceError::QuantityMismatch(format!(
                "shipment quantity {} exceeds the {} units approved by {}",
                self.shipment_quantity,
                inspection.approved_quantity,
                inspection.describe()
            )));
        }

        let token = repos
            .inspections
            .claim(&inspection, "shipment_claim", "shipment")
            .await?;

        let shipment = match self.write_shipment(&repos, &inspection, &shipped_by).await {
            Ok(shipment) => shipment,
            Err(e) => {
                error!("Shipment for {} failed: {}", inspection.describe(), e);
                repos
                    .inspections
                    .release(&inspection, "shipment_claim", &token)
                    .await;
                return Err(e);
            }
        };

        info!(
            shipment_number = %shipment.shipment_number,
            quantity = shipment.shipment_quantity,
            approved = inspection.approved_quantity,
            "Shipment created"
        );
        counter!("fulfillment_shipments_created_total", 1);
        event_sender
            .send_or_log(Event::ShipmentCreated {
                shipment_id: shipment.id,
                inspection_id: inspection.id,
                quantity: shipment.shipment_quantity,
            })
            .await;

        Ok(shipment)
    }
}

impl CreateShipmentCommand {
    async fn write_shipment(
        &self,
        repos: &Repositories,
        inspection: &QualityInspection,
        shipped_by: &str,
    ) -> Result<DeliveryShipment, ServiceError> {
        let shipment = repos
            .shipments
            .insert(
                Collection::DeliveryShipment,
                &json!({
                    "shipment_number": document_number("SHP", Utc::now().date_naive()),
                    "inspection_id": inspection.id,
                    "purchase_order_id": inspection.purchase_order_id,
                    "sales_order_id": inspection.sales_order_id,
                    "shipment_date": self.shipment_date.unwrap_or_else(|| Utc::now().date_naive()),
                    "shipped_by": shipped_by,
                    "shipment_quantity": self.shipment_quantity,
                    "delivery_method": self.delivery_method,
                    "delivery_address": self.delivery_address,
                    "delivery_contact": self.delivery_contact,
                    "tracking_number": self.tracking_number,
                    "shipment_status": ShipmentStatus::Preparing,
                }),
            )
            .await?;

        if let Err(e) = repos
            .inspections
            .patch(inspection, json!({ "shipment_id": shipment.id }))
            .await
        {
            repos.shipments.discard(&shipment).await;
            return Err(e);
        }
        Ok(shipment)
    }
}
