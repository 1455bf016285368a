use super::common::{created_response, success_response, CreatedResult, StatusUpdateRequest};
use crate::{
    commands::{
        breakdown::BreakdownLine,
        orders::{RouteOrderResult, RoutingStrategy},
    },
    models::{ApprovedQuotation, ItemBreakdown, SalesOrder, SalesOrderStatus},
    services::sales_orders::OrderFulfillmentSummary,
    ApiResponse, ApiResult, AppState,
};
use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesOrderListQuery {
    /// Filter by process status
    pub status: Option<SalesOrderStatus>,
    /// Filter by exact customer name
    pub customer_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "items": [
        {"item_code": "BOLT-M8", "item_description": "M8 bolt", "quantity": 30},
        {"item_code": "NUT-M8", "item_description": "M8 nut", "quantity": 20}
    ]
}))]
pub struct CreateBreakdownRequest {
    pub items: Vec<BreakdownLine>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sales-orders",
    request_body = ApprovedQuotation,
    responses(
        (status = 201, description = "Sales order created", body = ApiResponse<SalesOrder>),
        (status = 400, description = "Quotation is not approved or invalid", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quotation already converted", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn create_sales_order(
    State(state): State<AppState>,
    Json(quotation): Json<ApprovedQuotation>,
) -> CreatedResult<SalesOrder> {
    let order = state
        .services
        .sales_orders
        .create_from_quotation(quotation)
        .await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales-orders",
    params(SalesOrderListQuery),
    responses(
        (status = 200, description = "Sales orders listed", body = ApiResponse<Vec<SalesOrder>>)
    ),
    tag = "sales-orders"
)]
pub async fn list_sales_orders(
    State(state): State<AppState>,
    Query(query): Query<SalesOrderListQuery>,
) -> ApiResult<Vec<SalesOrder>> {
    let orders = state
        .services
        .sales_orders
        .list_orders(query.status, query.customer_name.as_deref())
        .await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales-orders/{id}",
    params(("id" = i64, Path, description = "Sales order id")),
    responses(
        (status = 200, description = "Sales order found", body = ApiResponse<SalesOrder>),
        (status = 404, description = "Sales order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<SalesOrder> {
    let order = state.services.sales_orders.get_order(id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales-orders/{id}/route",
    params(("id" = i64, Path, description = "Sales order id")),
    request_body = RoutingStrategy,
    responses(
        (status = 200, description = "Order routed", body = ApiResponse<RouteOrderResult>),
        (status = 400, description = "Order is not approved or a required field is missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already routed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Breakdown quantities do not match the order", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn route_sales_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(strategy): Json<RoutingStrategy>,
) -> ApiResult<RouteOrderResult> {
    let result = state.services.sales_orders.route_order(id, strategy).await?;
    Ok(success_response(result))
}

#[utoipa::path(
    put,
    path = "/api/v1/sales-orders/{id}/status",
    params(("id" = i64, Path, description = "Sales order id")),
    request_body = StatusUpdateRequest<SalesOrderStatus>,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<SalesOrder>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn update_sales_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest<SalesOrderStatus>>,
) -> ApiResult<SalesOrder> {
    let order = state
        .services
        .sales_orders
        .advance_status(id, request.status)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales-orders/{id}/breakdown",
    params(("id" = i64, Path, description = "Sales order id")),
    request_body = CreateBreakdownRequest,
    responses(
        (status = 201, description = "Breakdown created", body = ApiResponse<Vec<ItemBreakdown>>),
        (status = 409, description = "Order already routed or split", body = crate::errors::ErrorResponse),
        (status = 422, description = "Quantities do not sum to the order quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn create_breakdown(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CreateBreakdownRequest>,
) -> CreatedResult<Vec<ItemBreakdown>> {
    let items = state
        .services
        .breakdown
        .create_breakdown(id, request.items)
        .await?;
    Ok(created_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales-orders/{id}/breakdown",
    params(("id" = i64, Path, description = "Sales order id")),
    responses(
        (status = 200, description = "Breakdown items listed", body = ApiResponse<Vec<ItemBreakdown>>),
        (status = 404, description = "Sales order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn list_breakdown_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<ItemBreakdown>> {
    let items = state.services.breakdown.items_for_order(id).await?;
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales-orders/{id}/summary",
    params(("id" = i64, Path, description = "Sales order id")),
    responses(
        (status = 200, description = "Fulfillment summary", body = ApiResponse<OrderFulfillmentSummary>),
        (status = 404, description = "Sales order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-orders"
)]
pub async fn get_fulfillment_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<OrderFulfillmentSummary> {
    let summary = state.services.sales_orders.fulfillment_summary(id).await?;
    Ok(success_response(summary))
}
