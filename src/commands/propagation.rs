//! Completion propagation from purchase orders up to breakdown items and
//! sales orders.
//!
//! An external unit counts as fulfilled once its purchase order is
//! `completed`. An order with a breakdown completes when every item is
//! `completed`; an un-split order completes when internally processed
//! quantity plus completed purchase-order quantity covers the ordered
//! quantity. Every step is idempotent so a repeated delivery re-runs safely.

use metrics::counter;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        BreakdownItemStatus, ItemBreakdown, PurchaseOrder, PurchaseOrderStatus, SalesOrderStatus,
    },
    repositories::Repositories,
    store::Filter,
};

/// Moves a delivered purchase order from `received` to `completed` and
/// propagates upward.
#[instrument(skip(repos, events, po), fields(purchase_order_id = po.id))]
pub async fn complete_purchase_order(
    repos: &Repositories,
    events: &EventSender,
    po: PurchaseOrder,
) -> Result<(), ServiceError> {
    let po = match po.status {
        PurchaseOrderStatus::Completed => po,
        PurchaseOrderStatus::Received => {
            let completed = match repos
                .purchase_orders
                .transition(
                    &po,
                    "status",
                    PurchaseOrderStatus::Received,
                    json!({ "status": PurchaseOrderStatus::Completed }),
                )
                .await
            {
                Ok(completed) => completed,
                // Someone else completed it in the meantime.
                Err(ServiceError::ConcurrentModification(_)) => {
                    repos.purchase_orders.get(po.id).await?
                }
                Err(e) => return Err(e),
            };
            if completed.status != PurchaseOrderStatus::Completed {
                warn!(status = %completed.status, "Purchase order left incomplete after delivery");
                return Ok(());
            }
            info!(po_number = %completed.po_number, "Purchase order completed by delivery");
            counter!("fulfillment_purchase_orders_completed_total", 1);
            events
                .send_or_log(Event::PurchaseOrderStatusChanged {
                    purchase_order_id: completed.id,
                    old_status: PurchaseOrderStatus::Received,
                    new_status: PurchaseOrderStatus::Completed,
                })
                .await;
            completed
        }
        other => {
            warn!(status = %other, "Delivery for a purchase order that was never received");
            return Ok(());
        }
    };

    on_purchase_order_completed(repos, events, &po).await
}

/// Propagates a completed purchase order to its breakdown item or order.
pub async fn on_purchase_order_completed(
    repos: &Repositories,
    events: &EventSender,
    po: &PurchaseOrder,
) -> Result<(), ServiceError> {
    if let Some(item_id) = po.breakdown_item_id {
        let item = repos.breakdown_items.get(item_id).await?;
        if item.item_status == BreakdownItemStatus::Processed {
            complete_item(repos, events, &item).await?;
        } else {
            debug!(
                item_id,
                status = %item.item_status,
                "Breakdown item not yet processed; completion deferred"
            );
        }
        return Ok(());
    }

    if let Some(order_id) = po.sales_order_id {
        try_complete_order(repos, events, order_id).await?;
    }
    Ok(())
}

/// `processed -> completed` for one breakdown item, then re-checks its order.
pub async fn complete_item(
    repos: &Repositories,
    events: &EventSender,
    item: &ItemBreakdown,
) -> Result<(), ServiceError> {
    match repos
        .breakdown_items
        .transition(
            item,
            "item_status",
            BreakdownItemStatus::Processed,
            json!({ "item_status": BreakdownItemStatus::Completed }),
        )
        .await
    {
        Ok(_) => {
            info!(item_id = item.id, item_code = %item.item_code, "Breakdown item completed");
            events
                .send_or_log(Event::BreakdownItemStatusChanged {
                    item_id: item.id,
                    old_status: BreakdownItemStatus::Processed,
                    new_status: BreakdownItemStatus::Completed,
                })
                .await;
        }
        Err(ServiceError::ConcurrentModification(_)) => {
            debug!(item_id = item.id, "Breakdown item completed concurrently");
        }
        Err(e) => return Err(e),
    }

    try_complete_order(repos, events, item.sales_order_id)
        .await
        .map(|_| ())
}

/// Advances the order to `completed` when it is fully covered.
pub async fn try_complete_order(
    repos: &Repositories,
    events: &EventSender,
    order_id: i64,
) -> Result<bool, ServiceError> {
    let order = repos.sales_orders.get(order_id).await?;
    if !order
        .process_status
        .can_transition_to(SalesOrderStatus::Completed)
    {
        return Ok(false);
    }

    let by_order = Filter::new().eq("sales_order_id", order_id);
    let items = repos.breakdown_items.find(&by_order).await?;

    let covered = if items.is_empty() {
        let internal: i64 = repos
            .internal_processing
            .find(&by_order)
            .await?
            .iter()
            .map(|p| i64::from(p.processed_quantity))
            .sum();
        let procured: i64 = repos
            .purchase_orders
            .find(&by_order.clone().eq("status", PurchaseOrderStatus::Completed.to_string()))
            .await?
            .iter()
            .filter(|po| po.breakdown_item_id.is_none())
            .map(|po| i64::from(po.quantity))
            .sum();
        internal + procured >= i64::from(order.quantity)
    } else {
        items
            .iter()
            .all(|item| item.item_status == BreakdownItemStatus::Completed)
    };

    if !covered {
        debug!(order_id, "Sales order not yet fully covered");
        return Ok(false);
    }

    let old_status = order.process_status;
    match repos
        .sales_orders
        .transition(
            &order,
            "process_status",
            old_status,
            json!({ "process_status": SalesOrderStatus::Completed }),
        )
        .await
    {
        Ok(_) => {
            info!(order_id, order_number = %order.order_number, "Sales order completed");
            counter!("fulfillment_sales_orders_completed_total", 1);
            events
                .send_or_log(Event::SalesOrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: SalesOrderStatus::Completed,
                })
                .await;
            events.send_or_log(Event::SalesOrderCompleted(order_id)).await;
            Ok(true)
        }
        Err(ServiceError::ConcurrentModification(_)) => {
            // Status moved underneath us (typically another completion); re-check once.
            let current = repos.sales_orders.get(order_id).await?;
            Ok(current.process_status == SalesOrderStatus::Completed)
        }
        Err(e) => Err(e),
    }
}
