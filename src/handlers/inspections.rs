use super::common::{created_response, success_response, CreatedResult};
use crate::{
    commands::quality::RecordInspectionCommand, models::QualityInspection, ApiResponse, ApiResult,
    AppState,
};
use axum::extract::{Json, Path, State};

#[utoipa::path(
    post,
    path = "/api/v1/inspections",
    request_body = RecordInspectionCommand,
    responses(
        (status = 201, description = "Inspection recorded", body = ApiResponse<QualityInspection>),
        (status = 409, description = "Receiving already inspected", body = crate::errors::ErrorResponse),
        (status = 422, description = "Approved plus rejected does not equal received", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn record_inspection(
    State(state): State<AppState>,
    Json(command): Json<RecordInspectionCommand>,
) -> CreatedResult<QualityInspection> {
    let inspection = state.services.inspections.record_inspection(command).await?;
    Ok(created_response(inspection))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspections/shippable",
    responses(
        (status = 200, description = "Inspections ready to ship", body = ApiResponse<Vec<QualityInspection>>)
    ),
    tag = "inspections"
)]
pub async fn list_shippable_inspections(
    State(state): State<AppState>,
) -> ApiResult<Vec<QualityInspection>> {
    let inspections = state.services.inspections.shippable_inspections().await?;
    Ok(success_response(inspections))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspections/{id}",
    params(("id" = i64, Path, description = "Inspection id")),
    responses(
        (status = 200, description = "Inspection found", body = ApiResponse<QualityInspection>),
        (status = 404, description = "Inspection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<QualityInspection> {
    let inspection = state.services.inspections.get_inspection(id).await?;
    Ok(success_response(inspection))
}
