use super::common::{created_response, success_response, CreatedResult, StatusUpdateRequest};
use crate::{
    commands::purchaseorders::CreateReplenishmentOrderCommand,
    models::{PurchaseOrder, PurchaseOrderStatus, PurchaseType},
    ApiResponse, ApiResult, AppState,
};
use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderListQuery {
    pub status: Option<PurchaseOrderStatus>,
    pub purchase_type: Option<PurchaseType>,
    pub sales_order_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(PurchaseOrderListQuery),
    responses(
        (status = 200, description = "Purchase orders listed", body = ApiResponse<Vec<PurchaseOrder>>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(query): Query<PurchaseOrderListQuery>,
) -> ApiResult<Vec<PurchaseOrder>> {
    let orders = state
        .services
        .procurement
        .list_purchase_orders(query.status, query.purchase_type, query.sales_order_id)
        .await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/receivable",
    responses(
        (status = 200, description = "Purchase orders awaiting receipt", body = ApiResponse<Vec<PurchaseOrder>>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_receivable_purchase_orders(
    State(state): State<AppState>,
) -> ApiResult<Vec<PurchaseOrder>> {
    let orders = state.services.procurement.receivable_purchase_orders().await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = i64, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order found", body = ApiResponse<PurchaseOrder>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PurchaseOrder> {
    let order = state.services.procurement.get_purchase_order(id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/replenishment",
    request_body = CreateReplenishmentOrderCommand,
    responses(
        (status = 201, description = "Replenishment order created", body = ApiResponse<PurchaseOrder>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_replenishment_order(
    State(state): State<AppState>,
    Json(command): Json<CreateReplenishmentOrderCommand>,
) -> CreatedResult<PurchaseOrder> {
    let order = state
        .services
        .procurement
        .create_replenishment_order(command)
        .await?;
    Ok(created_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = i64, Path, description = "Purchase order id")),
    request_body = StatusUpdateRequest<PurchaseOrderStatus>,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<PurchaseOrder>),
        (status = 400, description = "Not the next status in the lifecycle", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase order changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest<PurchaseOrderStatus>>,
) -> ApiResult<PurchaseOrder> {
    let order = state
        .services
        .procurement
        .advance_status(id, request.status)
        .await?;
    Ok(success_response(order))
}
