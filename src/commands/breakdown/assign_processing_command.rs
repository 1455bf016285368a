use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, extended_total, require_some_text, BreakdownItemStatus,
        InternalProcessing, ItemBreakdown, ProcessingType, PurchaseOrder, PurchaseOrderStatus,
        PurchaseType, SalesOrder, SalesOrderStatus, StoredModel,
    },
    repositories::Repositories,
    store::{Collection, Filter, RecordStore},
};

/// Decides how much of a breakdown item comes from stock and how much is bought.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignProcessingCommand {
    #[serde(default)]
    pub item_id: i64,
    #[validate(range(min = 0))]
    pub internal_quantity: i32,
    #[validate(range(min = 0))]
    pub external_quantity: i32,
    /// Required when `external_quantity > 0`.
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub supplier_contact: Option<String>,
    /// Defaults to zero when the cost is not yet known.
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub expected_arrival_date: Option<NaiveDate>,
    /// Required when `internal_quantity > 0`.
    #[serde(default)]
    pub warehouse_location: Option<String>,
    #[serde(default)]
    pub processed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignProcessingResult {
    pub item: ItemBreakdown,
    pub purchase_order: Option<PurchaseOrder>,
    pub internal_processing: Option<InternalProcessing>,
}

struct Supplier {
    name: String,
    unit_cost: Decimal,
    total_cost: Decimal,
}

struct Stock {
    location: String,
    processed_by: String,
}

#[async_trait]
impl Command for AssignProcessingCommand {
    type Result = AssignProcessingResult;

    #[instrument(skip(self, store, event_sender), fields(item_id = self.item_id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let supplier = if self.external_quantity > 0 {
            let unit_cost = self.unit_cost.unwrap_or_default();
            if unit_cost.is_sign_negative() {
                return Err(ServiceError::ValidationError(
                    "unit_cost must not be negative".to_string(),
                ));
            }
            Some(Supplier {
                name: require_some_text(self.supplier_name.as_deref(), "supplier_name")?,
                unit_cost,
                total_cost: extended_total(unit_cost, self.external_quantity, "total_cost")?,
            })
        } else {
            None
        };
        let stock = if self.internal_quantity > 0 {
            Some(Stock {
                location: require_some_text(
                    self.warehouse_location.as_deref(),
                    "warehouse_location",
                )?,
                processed_by: require_some_text(self.processed_by.as_deref(), "processed_by")?,
            })
        } else {
            None
        };

        let repos = Repositories::new(store);
        let item = repos.breakdown_items.get(self.item_id).await?;

        if item.item_status != BreakdownItemStatus::Pending {
            return Err(ServiceError::invalid_transition(
                item.describe(),
                item.item_status,
                BreakdownItemStatus::StockChecked,
            ));
        }
        let split = i64::from(self.internal_quantity) + i64::from(self.external_quantity);
        if split != i64::from(item.quantity) {
            return Err(ServiceError::QuantityMismatch(format!(
                "internal {} + external {} does not equal {} quantity {}",
                self.internal_quantity,
                self.external_quantity,
                item.describe(),
                item.quantity
            )));
        }
        let processing_type =
            ProcessingType::from_split(self.internal_quantity, self.external_quantity).ok_or_else(
                || {
                    ServiceError::QuantityMismatch(format!(
                        "{} has no quantity to assign",
                        item.describe()
                    ))
                },
            )?;

        let order = repos.sales_orders.get(item.sales_order_id).await?;
        verify_order_total(&repos, &order).await?;

        // Taking the item out of `pending` is the claim on its assignment.
        let assigned = repos
            .breakdown_items
            .transition(
                &item,
                "item_status",
                BreakdownItemStatus::Pending,
                json!({
                    "item_status": BreakdownItemStatus::StockChecked,
                    "processing_type": processing_type,
                    "internal_quantity": self.internal_quantity,
                    "external_quantity": self.external_quantity,
                }),
            )
            .await
            .map_err(|e| match e {
                ServiceError::ConcurrentModification(_) => ServiceError::AlreadyClaimed(format!(
                    "{} already has processing assigned",
                    item.describe()
                )),
                other => other,
            })?;

        let mut purchase_order = None;
        let mut internal_processing = None;
        let outcome = async {
            if let Some(supplier) = &supplier {
                purchase_order = Some(
                    repos
                        .purchase_orders
                        .insert(
                            PurchaseType::BreakdownExternal.collection(),
                            &json!({
                                "po_number": document_number("PO", Utc::now().date_naive()),
                                "purchase_type": PurchaseType::BreakdownExternal,
                                "sales_order_id": order.id,
                                "breakdown_item_id": item.id,
                                "supplier_name": supplier.name,
                                "supplier_contact": self.supplier_contact,
                                "item_code": item.item_code,
                                "item_description": item.item_description,
                                "quantity": self.external_quantity,
                                "unit_cost": supplier.unit_cost,
                                "total_cost": supplier.total_cost,
                                "currency": order.currency,
                                "order_date": Utc::now().date_naive(),
                                "expected_arrival_date": self.expected_arrival_date,
                                "status": PurchaseOrderStatus::Ordered,
                                "notes": self.notes,
                            }),
                        )
                        .await?,
                );
            }
            if let Some(stock) = &stock {
                internal_processing = Some(
                    repos
                        .internal_processing
                        .insert(
                            Collection::InternalProcessing,
                            &json!({
                                "sales_order_id": order.id,
                                "breakdown_item_id": item.id,
                                "warehouse_location": stock.location,
                                "processed_quantity": self.internal_quantity,
                                "processing_date": Utc::now().date_naive(),
                                "processed_by": stock.processed_by,
                                "notes": self.notes,
                            }),
                        )
                        .await?,
                );
            }
            repos
                .breakdown_items
                .patch(
                    &assigned,
                    json!({
                        "purchase_order_id": purchase_order.as_ref().map(|po: &PurchaseOrder| po.id),
                        "internal_processing_id": internal_processing
                            .as_ref()
                            .map(|p: &InternalProcessing| p.id),
                    }),
                )
                .await
        }
        .await;

        let item = match outcome {
            Ok(item) => item,
            Err(e) => {
                error!("Assignment of {} failed, rolling back: {}", item.describe(), e);
                if let Some(po) = &purchase_order {
                    repos.purchase_orders.discard(po).await;
                }
                if let Some(processing) = &internal_processing {
                    repos.internal_processing.discard(processing).await;
                }
                if let Err(e) = repos
                    .breakdown_items
                    .transition(
                        &assigned,
                        "item_status",
                        BreakdownItemStatus::StockChecked,
                        json!({
                            "item_status": BreakdownItemStatus::Pending,
                            "processing_type": null,
                            "internal_quantity": null,
                            "external_quantity": null,
                            "purchase_order_id": null,
                            "internal_processing_id": null,
                        }),
                    )
                    .await
                {
                    error!("Failed to reset {}: {}", item.describe(), e);
                }
                return Err(e);
            }
        };

        info!(
            item_code = %item.item_code,
            processing_type = %processing_type,
            internal = self.internal_quantity,
            external = self.external_quantity,
            "Breakdown item processing assigned"
        );
        counter!("fulfillment_breakdown_items_assigned_total", 1, "processing_type" => processing_type.to_string());

        if let Some(po) = &purchase_order {
            event_sender
                .send_or_log(Event::PurchaseOrderCreated {
                    purchase_order_id: po.id,
                    purchase_type: po.purchase_type,
                    quantity: po.quantity,
                })
                .await;
        }
        if let Some(processing) = &internal_processing {
            event_sender
                .send_or_log(Event::InternalProcessingRecorded {
                    processing_id: processing.id,
                    order_id: order.id,
                    quantity: processing.processed_quantity,
                })
                .await;
        }
        event_sender
            .send_or_log(Event::BreakdownItemAssigned {
                item_id: item.id,
                processing_type,
                internal_quantity: self.internal_quantity,
                external_quantity: self.external_quantity,
            })
            .await;

        advance_order_when_assigned(&repos, &event_sender, &order).await?;

        Ok(AssignProcessingResult {
            item,
            purchase_order,
            internal_processing,
        })
    }
}

/// Re-checks the split against the persisted order rather than a cached total.
async fn verify_order_total(repos: &Repositories, order: &SalesOrder) -> Result<(), ServiceError> {
    let items = repos
        .breakdown_items
        .find(&Filter::new().eq("sales_order_id", order.id))
        .await?;
    let total: i64 = items.iter().map(|item| i64::from(item.quantity)).sum();
    if total != i64::from(order.quantity) {
        return Err(ServiceError::QuantityMismatch(format!(
            "breakdown quantities sum to {} but {} has quantity {}",
            total,
            order.describe(),
            order.quantity
        )));
    }
    Ok(())
}

/// `approved -> ordered` once every breakdown item has processing assigned.
async fn advance_order_when_assigned(
    repos: &Repositories,
    events: &EventSender,
    order: &SalesOrder,
) -> Result<(), ServiceError> {
    let items = repos
        .breakdown_items
        .find(&Filter::new().eq("sales_order_id", order.id))
        .await?;
    if !items.iter().all(ItemBreakdown::is_assigned) {
        return Ok(());
    }

    let current = repos.sales_orders.get(order.id).await?;
    if current.process_status != SalesOrderStatus::Approved {
        return Ok(());
    }
    match repos
        .sales_orders
        .transition(
            &current,
            "process_status",
            SalesOrderStatus::Approved,
            json!({ "process_status": SalesOrderStatus::Ordered }),
        )
        .await
    {
        Ok(_) => {
            info!(order_number = %current.order_number, "All breakdown items assigned; order placed");
            events
                .send_or_log(Event::SalesOrderStatusChanged {
                    order_id: current.id,
                    old_status: SalesOrderStatus::Approved,
                    new_status: SalesOrderStatus::Ordered,
                })
                .await;
            Ok(())
        }
        Err(ServiceError::ConcurrentModification(_)) => {
            warn!(order_id = current.id, "Order advanced concurrently by another assignment");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
