use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use super::service::PipelineService;
use super::types::*;
use crate::core::access::Caller;
use crate::core::shared::error::CrmResult;
use crate::core::shared::extract::CrmJson;
use crate::core::shared::models::SuccessResponse;
use crate::core::shared::state::AppState;

pub async fn create_stage_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<CreateStageRequest>,
) -> CrmResult<(StatusCode, Json<StageResponse>)> {
    let service = PipelineService::new(&state);
    let stage = service.create_stage(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(StageResponse { stage })))
}

pub async fn delete_stage_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<StageIdRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = PipelineService::new(&state);
    service.delete_stage(&caller, request.id).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn reorder_stages_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<ReorderRequest>,
) -> CrmResult<Json<StageListResponse>> {
    let service = PipelineService::new(&state);
    let stages = service
        .reorder(&caller, request.origin_id, &request.stage_ids)
        .await?;
    Ok(Json(StageListResponse { stages }))
}

pub async fn move_stage_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<MoveStageRequest>,
) -> CrmResult<Json<StageListResponse>> {
    let service = PipelineService::new(&state);
    let stages = service
        .move_stage(&caller, request.stage_id, request.to_index)
        .await?;
    Ok(Json(StageListResponse { stages }))
}

pub async fn update_contact_stage_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<MoveContactRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = PipelineService::new(&state);
    service
        .move_contact(&caller, request.contact_id, request.stage_id)
        .await?;
    Ok(Json(SuccessResponse::OK))
}
