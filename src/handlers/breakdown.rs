use super::common::success_response;
use crate::{
    commands::breakdown::{AssignProcessingCommand, AssignProcessingResult},
    models::ItemBreakdown,
    ApiResponse, ApiResult, AppState,
};
use axum::extract::{Json, Path, State};

#[utoipa::path(
    get,
    path = "/api/v1/breakdown-items/{id}",
    params(("id" = i64, Path, description = "Breakdown item id")),
    responses(
        (status = 200, description = "Breakdown item found", body = ApiResponse<ItemBreakdown>),
        (status = 404, description = "Breakdown item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "breakdown"
)]
pub async fn get_breakdown_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ItemBreakdown> {
    let item = state.services.breakdown.get_item(id).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/breakdown-items/{id}/assign",
    params(("id" = i64, Path, description = "Breakdown item id")),
    request_body = AssignProcessingCommand,
    responses(
        (status = 200, description = "Processing assigned", body = ApiResponse<AssignProcessingResult>),
        (status = 400, description = "Item is not pending or supplier data is missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item already assigned", body = crate::errors::ErrorResponse),
        (status = 422, description = "Split does not equal the item quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "breakdown"
)]
pub async fn assign_processing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut command): Json<AssignProcessingCommand>,
) -> ApiResult<AssignProcessingResult> {
    command.item_id = id;
    let result = state.services.breakdown.assign_processing(command).await?;
    Ok(success_response(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/breakdown-items/{id}/processed",
    params(("id" = i64, Path, description = "Breakdown item id")),
    responses(
        (status = 200, description = "Item marked processed", body = ApiResponse<ItemBreakdown>),
        (status = 400, description = "Item has not been assigned", body = crate::errors::ErrorResponse)
    ),
    tag = "breakdown"
)]
pub async fn mark_processed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ItemBreakdown> {
    let item = state.services.breakdown.mark_processed(id).await?;
    Ok(success_response(item))
}
