use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::{
    commands::{
        breakdown::{BreakdownLine, CreateBreakdownCommand},
        Command,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        document_number, extended_total, require_some_text, FulfillmentRoute, InternalProcessing,
        ItemBreakdown, PurchaseOrder, PurchaseOrderStatus, PurchaseType, SalesOrder,
        SalesOrderStatus, StoredModel,
    },
    repositories::{Repositories, Repository},
    store::{Collection, RecordStore},
};

/// How an approved order is fulfilled.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Ship from existing stock.
    Internal {
        #[serde(default)]
        warehouse_location: Option<String>,
        #[serde(default)]
        processed_by: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    /// One purchase order for the full quantity.
    External {
        #[serde(default)]
        supplier_name: Option<String>,
        #[serde(default)]
        supplier_contact: Option<String>,
        #[serde(default)]
        unit_cost: Decimal,
        #[serde(default)]
        expected_arrival_date: Option<NaiveDate>,
        #[serde(default)]
        notes: Option<String>,
    },
    /// Split by item code.
    Breakdown { items: Vec<BreakdownLine> },
}

impl RoutingStrategy {
    pub fn route(&self) -> FulfillmentRoute {
        match self {
            RoutingStrategy::Internal { .. } => FulfillmentRoute::Internal,
            RoutingStrategy::External { .. } => FulfillmentRoute::External,
            RoutingStrategy::Breakdown { .. } => FulfillmentRoute::Breakdown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOrderCommand {
    pub order_id: i64,
    pub strategy: RoutingStrategy,
}

/// The routed order and the descendant records created for it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteOrderResult {
    pub order: SalesOrder,
    pub internal_processing: Option<InternalProcessing>,
    pub purchase_order: Option<PurchaseOrder>,
    #[serde(default)]
    pub breakdown_items: Vec<ItemBreakdown>,
}

/// Validated inputs of the single-descendant routes.
enum Descendant {
    Internal {
        warehouse_location: String,
        processed_by: String,
        notes: Option<String>,
    },
    External {
        supplier_name: String,
        supplier_contact: Option<String>,
        unit_cost: Decimal,
        total_cost: Decimal,
        expected_arrival_date: Option<NaiveDate>,
        notes: Option<String>,
    },
}

#[async_trait]
impl Command for RouteOrderCommand {
    type Result = RouteOrderResult;

    #[instrument(skip(self, store, event_sender), fields(order_id = self.order_id, route = %self.strategy.route()))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let mut descendant = match &self.strategy {
            RoutingStrategy::Breakdown { items } => {
                let command = CreateBreakdownCommand {
                    order_id: self.order_id,
                    items: items.clone(),
                };
                let breakdown_items = command.execute(store.clone(), event_sender.clone()).await?;
                let order = Repository::<SalesOrder>::new(store)
                    .get(self.order_id)
                    .await?;
                return Ok(RouteOrderResult {
                    order,
                    internal_processing: None,
                    purchase_order: None,
                    breakdown_items,
                });
            }
            RoutingStrategy::Internal {
                warehouse_location,
                processed_by,
                notes,
            } => Descendant::Internal {
                warehouse_location: require_some_text(
                    warehouse_location.as_deref(),
                    "warehouse_location",
                )?,
                processed_by: require_some_text(processed_by.as_deref(), "processed_by")?,
                notes: notes.clone(),
            },
            RoutingStrategy::External {
                supplier_name,
                supplier_contact,
                unit_cost,
                expected_arrival_date,
                notes,
            } => {
                if unit_cost.is_sign_negative() {
                    return Err(ServiceError::ValidationError(
                        "unit_cost must not be negative".to_string(),
                    ));
                }
                Descendant::External {
                    supplier_name: require_some_text(supplier_name.as_deref(), "supplier_name")?,
                    supplier_contact: supplier_contact.clone(),
                    unit_cost: *unit_cost,
                    total_cost: Decimal::ZERO,
                    expected_arrival_date: *expected_arrival_date,
                    notes: notes.clone(),
                }
            }
        };

        let repos = Repositories::new(store);
        let order = repos.sales_orders.get(self.order_id).await?;
        let target = match &descendant {
            Descendant::Internal { .. } => SalesOrderStatus::InternalProcessed,
            Descendant::External { .. } => SalesOrderStatus::ExternalOrdered,
        };
        if order.process_status != SalesOrderStatus::Approved {
            return Err(ServiceError::invalid_transition(
                order.describe(),
                order.process_status,
                target,
            ));
        }
        if let Descendant::External {
            unit_cost,
            total_cost,
            ..
        } = &mut descendant
        {
            *total_cost = extended_total(*unit_cost, order.quantity, "total_cost")?;
        }

        let token = repos
            .sales_orders
            .claim(&order, "routing_claim", "fulfillment route")
            .await?;

        let routed = match repos
            .sales_orders
            .transition(
                &order,
                "process_status",
                SalesOrderStatus::Approved,
                json!({
                    "process_status": target,
                    "fulfillment_route": self.strategy.route(),
                }),
            )
            .await
        {
            Ok(routed) => routed,
            Err(e) => {
                repos.sales_orders.release(&order, "routing_claim", &token).await;
                return Err(e);
            }
        };

        let created = match &descendant {
            Descendant::Internal {
                warehouse_location,
                processed_by,
                notes,
            } => repos
                .internal_processing
                .insert(
                    Collection::InternalProcessing,
                    &json!({
                        "sales_order_id": order.id,
                        "breakdown_item_id": null,
                        "warehouse_location": warehouse_location,
                        "processed_quantity": order.quantity,
                        "processing_date": Utc::now().date_naive(),
                        "processed_by": processed_by,
                        "notes": notes,
                    }),
                )
                .await
                .map(|processing| (Some(processing), None)),
            Descendant::External {
                supplier_name,
                supplier_contact,
                unit_cost,
                total_cost,
                expected_arrival_date,
                notes,
            } => repos
                .purchase_orders
                .insert(
                    PurchaseType::CustomerOrder.collection(),
                    &json!({
                        "po_number": document_number("PO", Utc::now().date_naive()),
                        "purchase_type": PurchaseType::CustomerOrder,
                        "sales_order_id": order.id,
                        "breakdown_item_id": null,
                        "supplier_name": supplier_name,
                        "supplier_contact": supplier_contact,
                        "item_code": order.item_code,
                        "item_description": order.item_description,
                        "quantity": order.quantity,
                        "unit_cost": unit_cost,
                        "total_cost": total_cost,
                        "currency": order.currency,
                        "order_date": Utc::now().date_naive(),
                        "expected_arrival_date": expected_arrival_date,
                        "status": PurchaseOrderStatus::Ordered,
                        "notes": notes,
                    }),
                )
                .await
                .map(|po| (None, Some(po))),
        };

        let (internal_processing, purchase_order) = match created {
            Ok(created) => created,
            Err(e) => {
                error!("Routing {} failed, restoring approved status: {}", order.describe(), e);
                undo_routing(&repos.sales_orders, &routed, target, &token).await;
                return Err(e);
            }
        };

        info!(
            order_number = %routed.order_number,
            status = %routed.process_status,
            "Sales order routed"
        );
        counter!("fulfillment_orders_routed_total", 1, "route" => self.strategy.route().to_string());

        if let Some(processing) = &internal_processing {
            event_sender
                .send_or_log(Event::InternalProcessingRecorded {
                    processing_id: processing.id,
                    order_id: order.id,
                    quantity: processing.processed_quantity,
                })
                .await;
        }
        if let Some(po) = &purchase_order {
            event_sender
                .send_or_log(Event::PurchaseOrderCreated {
                    purchase_order_id: po.id,
                    purchase_type: po.purchase_type,
                    quantity: po.quantity,
                })
                .await;
        }
        event_sender
            .send_or_log(Event::SalesOrderRouted {
                order_id: order.id,
                strategy: self.strategy.route().to_string(),
            })
            .await;
        event_sender
            .send_or_log(Event::SalesOrderStatusChanged {
                order_id: order.id,
                old_status: SalesOrderStatus::Approved,
                new_status: target,
            })
            .await;

        Ok(RouteOrderResult {
            order: routed,
            internal_processing,
            purchase_order,
            breakdown_items: Vec::new(),
        })
    }
}

async fn undo_routing(
    orders: &Repository<SalesOrder>,
    routed: &SalesOrder,
    target: SalesOrderStatus,
    token: &str,
) {
    if let Err(e) = orders
        .transition(
            routed,
            "process_status",
            target,
            json!({
                "process_status": SalesOrderStatus::Approved,
                "fulfillment_route": null,
            }),
        )
        .await
    {
        error!("Failed to restore {} to approved: {}", routed.describe(), e);
        return;
    }
    orders.release(routed, "routing_claim", token).await;
}
