use super::common::{created_response, success_response, CreatedResult};
use crate::{
    commands::receiving::{RecordReceivingCommand, RecordReceivingResult},
    models::InventoryReceiving,
    ApiResponse, ApiResult, AppState,
};
use axum::extract::{Json, Path, State};

#[utoipa::path(
    post,
    path = "/api/v1/receivings",
    request_body = RecordReceivingCommand,
    responses(
        (status = 201, description = "Goods received", body = ApiResponse<RecordReceivingResult>),
        (status = 400, description = "Purchase order cannot be received", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase order already received", body = crate::errors::ErrorResponse)
    ),
    tag = "receiving"
)]
pub async fn record_receiving(
    State(state): State<AppState>,
    Json(command): Json<RecordReceivingCommand>,
) -> CreatedResult<RecordReceivingResult> {
    let result = state.services.receiving.record_receiving(command).await?;
    Ok(created_response(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/receivings/inspectable",
    responses(
        (status = 200, description = "Receivings awaiting inspection", body = ApiResponse<Vec<InventoryReceiving>>)
    ),
    tag = "receiving"
)]
pub async fn list_inspectable_receivings(
    State(state): State<AppState>,
) -> ApiResult<Vec<InventoryReceiving>> {
    let receivings = state.services.receiving.inspectable_receivings().await?;
    Ok(success_response(receivings))
}

#[utoipa::path(
    get,
    path = "/api/v1/receivings/{id}",
    params(("id" = i64, Path, description = "Receiving id")),
    responses(
        (status = 200, description = "Receiving found", body = ApiResponse<InventoryReceiving>),
        (status = 404, description = "Receiving not found", body = crate::errors::ErrorResponse)
    ),
    tag = "receiving"
)]
pub async fn get_receiving(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<InventoryReceiving> {
    let receiving = state.services.receiving.get_receiving(id).await?;
    Ok(success_response(receiving))
}
