use crate::{
    commands::{
        orders::{
            AdvanceSalesOrderCommand, CreateSalesOrderCommand, RouteOrderCommand,
            RouteOrderResult, RoutingStrategy,
        },
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{
        ApprovedQuotation, BreakdownItemStatus, FulfillmentRoute, PurchaseOrderStatus, SalesOrder,
        SalesOrderStatus, ShipmentStatus,
    },
    repositories::Repositories,
    store::{Filter, RecordStore},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

/// Quantities that show how far an order has been fulfilled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderFulfillmentSummary {
    pub order_id: i64,
    pub order_number: String,
    pub process_status: SalesOrderStatus,
    pub fulfillment_route: Option<FulfillmentRoute>,
    pub ordered_quantity: i32,
    /// Units satisfied from stock.
    pub internally_processed: i64,
    /// Units on purchase orders, whatever their status.
    pub procured: i64,
    /// Units on purchase orders that reached `completed`.
    pub procurement_completed: i64,
    pub received: i64,
    pub approved: i64,
    pub rejected: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub breakdown_items: usize,
    pub breakdown_items_completed: usize,
}

/// Service for sales orders: conversion, routing and status
#[derive(Clone)]
pub struct SalesOrderService {
    store: Arc<dyn RecordStore>,
    event_sender: Arc<EventSender>,
    repos: Repositories,
    default_currency: String,
}

impl SalesOrderService {
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

    /// Converts an approved quotation into a sales order
    #[instrument(skip(self, quotation), fields(quote_number = %quotation.quote_number))]
    pub async fn create_from_quotation(
        &self,
        quotation: ApprovedQuotation,
    ) -> Result<SalesOrder, ServiceError> {
        CreateSalesOrderCommand {
            quotation,
            default_currency: self.default_currency.clone(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }

    /// Gets a sales order by ID
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i64) -> Result<SalesOrder, ServiceError> {
        self.repos.sales_orders.get(order_id).await
    }

    /// Lists sales orders, optionally filtered by status and customer
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<SalesOrderStatus>,
        customer_name: Option<&str>,
    ) -> Result<Vec<SalesOrder>, ServiceError> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.eq("process_status", status.to_string());
        }
        if let Some(customer) = customer_name {
            filter = filter.eq("customer_name", customer.trim());
        }
        self.repos.sales_orders.find(&filter).await.map_err(|e| {
            error!("Failed to list sales orders: {}", e);
            e
        })
    }

    /// Chooses internal, external or per-code fulfillment
    #[instrument(skip(self, strategy))]
    pub async fn route_order(
        &self,
        order_id: i64,
        strategy: RoutingStrategy,
    ) -> Result<RouteOrderResult, ServiceError> {
        RouteOrderCommand { order_id, strategy }
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    /// Manual status move, e.g. closing a fulfilled order
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        order_id: i64,
        status: SalesOrderStatus,
    ) -> Result<SalesOrder, ServiceError> {
        AdvanceSalesOrderCommand { order_id, status }
            .execute(self.store.clone(), self.event_sender.clone())
            .await
    }

    /// Aggregates the downstream records of one order
    #[instrument(skip(self))]
    pub async fn fulfillment_summary(
        &self,
        order_id: i64,
    ) -> Result<OrderFulfillmentSummary, ServiceError> {
        let order = self.repos.sales_orders.get(order_id).await?;
        let by_order = Filter::new().eq("sales_order_id", order_id);

        let internally_processed = self
            .repos
            .internal_processing
            .find(&by_order)
            .await?
            .iter()
            .map(|p| i64::from(p.processed_quantity))
            .sum();

        let purchase_orders = self.repos.purchase_orders.find(&by_order).await?;
        let procured = purchase_orders.iter().map(|po| i64::from(po.quantity)).sum();
        let procurement_completed = purchase_orders
            .iter()
            .filter(|po| po.status == PurchaseOrderStatus::Completed)
            .map(|po| i64::from(po.quantity))
            .sum();

        let received = self
            .repos
            .receivings
            .find(&by_order)
            .await?
            .iter()
            .map(|r| i64::from(r.received_quantity))
            .sum();

        let inspections = self.repos.inspections.find(&by_order).await?;
        let approved = inspections.iter().map(|i| i64::from(i.approved_quantity)).sum();
        let rejected = inspections.iter().map(|i| i64::from(i.rejected_quantity)).sum();

        let shipments = self.repos.shipments.find(&by_order).await?;
        let shipped = shipments
            .iter()
            .filter(|s| s.shipment_status != ShipmentStatus::Returned)
            .map(|s| i64::from(s.shipment_quantity))
            .sum();
        let delivered = shipments
            .iter()
            .filter(|s| s.shipment_status == ShipmentStatus::Delivered)
            .map(|s| i64::from(s.shipment_quantity))
            .sum();

        let items = self.repos.breakdown_items.find(&by_order).await?;
        let breakdown_items_completed = items
            .iter()
            .filter(|item| item.item_status == BreakdownItemStatus::Completed)
            .count();

        Ok(OrderFulfillmentSummary {
            order_id: order.id,
            order_number: order.order_number,
            process_status: order.process_status,
            fulfillment_route: order.fulfillment_route,
            ordered_quantity: order.quantity,
            internally_processed,
            procured,
            procurement_completed,
            received,
            approved,
            rejected,
            shipped,
            delivered,
            breakdown_items: items.len(),
            breakdown_items_completed,
        })
    }
}
