use super::common::{created_response, success_response, CreatedResult, StatusUpdateRequest};
use crate::{
    commands::shipments::CreateShipmentCommand,
    models::{DeliveryShipment, ShipmentStatus},
    ApiResponse, ApiResult, AppState,
};
use axum::extract::{Json, Path, State};

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentCommand,
    responses(
        (status = 201, description = "Shipment created", body = ApiResponse<DeliveryShipment>),
        (status = 400, description = "Inspection is not approved for shipment", body = crate::errors::ErrorResponse),
        (status = 409, description = "Inspection already shipped", body = crate::errors::ErrorResponse),
        (status = 422, description = "Shipment quantity exceeds approved quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(command): Json<CreateShipmentCommand>,
) -> CreatedResult<DeliveryShipment> {
    let shipment = state.services.shipments.create_shipment(command).await?;
    Ok(created_response(shipment))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = i64, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment found", body = ApiResponse<DeliveryShipment>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeliveryShipment> {
    let shipment = state.services.shipments.get_shipment(id).await?;
    Ok(success_response(shipment))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/{id}/status",
    params(("id" = i64, Path, description = "Shipment id")),
    request_body = StatusUpdateRequest<ShipmentStatus>,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<DeliveryShipment>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn update_shipment_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusUpdateRequest<ShipmentStatus>>,
) -> ApiResult<DeliveryShipment> {
    let shipment = state
        .services
        .shipments
        .advance_status(id, request.status)
        .await?;
    Ok(success_response(shipment))
}
