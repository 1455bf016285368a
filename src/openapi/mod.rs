use crate::AppState;
use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fulfillment Pipeline API",
        version = "0.1.0",
        description = r#"
# Order Fulfillment Pipeline

Tracks a customer order from an approved quotation to delivery.

- **Sales orders**: converted from approved quotations, then routed to stock,
  to a supplier, or split per item code
- **Breakdown items**: each split line is assigned between stock and purchase
- **Purchase orders**: supplier orders for customer demand and stock replenishment
- **Receiving and inspection**: one receiving per purchase order, one
  inspection per receiving
- **Shipments**: delivering a shipment completes its purchase order and,
  once every unit is covered, the sales order

## Error Handling

Rejected requests return a JSON body naming the rule that failed:

```json
{
  "error": "Conflict",
  "code": "already_claimed",
  "message": "Already claimed: inspection QI-20261018-4F7A1C2B already has a shipment",
  "timestamp": "2026-10-18T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "sales-orders", description = "Sales order conversion, routing and status"),
        (name = "breakdown", description = "Per item code processing assignment"),
        (name = "purchase-orders", description = "Purchase order lifecycle"),
        (name = "receiving", description = "Goods arrival"),
        (name = "inspections", description = "Quality gate"),
        (name = "shipments", description = "Outbound delivery"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Sales orders
        crate::handlers::sales_orders::create_sales_order,
        crate::handlers::sales_orders::list_sales_orders,
        crate::handlers::sales_orders::get_sales_order,
        crate::handlers::sales_orders::route_sales_order,
        crate::handlers::sales_orders::update_sales_order_status,
        crate::handlers::sales_orders::create_breakdown,
        crate::handlers::sales_orders::list_breakdown_items,
        crate::handlers::sales_orders::get_fulfillment_summary,

        // Breakdown
        crate::handlers::breakdown::get_breakdown_item,
        crate::handlers::breakdown::assign_processing,
        crate::handlers::breakdown::mark_processed,

        // Purchase orders
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::list_receivable_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::create_replenishment_order,
        crate::handlers::purchase_orders::update_purchase_order_status,

        // Warehouse
        crate::handlers::receivings::record_receiving,
        crate::handlers::receivings::list_inspectable_receivings,
        crate::handlers::receivings::get_receiving,
        crate::handlers::inspections::record_inspection,
        crate::handlers::inspections::list_shippable_inspections,
        crate::handlers::inspections::get_inspection,
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::update_shipment_status,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::models::SalesOrder,
            crate::models::SalesOrderStatus,
            crate::models::FulfillmentRoute,
            crate::models::ApprovedQuotation,
            crate::models::QuotationStatus,
            crate::models::ItemBreakdown,
            crate::models::PurchaseOrder,
            crate::models::PurchaseType,
            crate::models::PurchaseOrderStatus,
            crate::models::InternalProcessing,
            crate::models::InventoryReceiving,
            crate::models::QualityInspection,
            crate::models::InspectionMethod,
            crate::models::DeliveryShipment,
            crate::models::ShipmentStatus,
            crate::commands::orders::RoutingStrategy,
            crate::commands::breakdown::BreakdownLine,
            crate::services::sales_orders::OrderFulfillmentSummary,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
