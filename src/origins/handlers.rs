use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use super::service::OriginsService;
use super::types::*;
use crate::core::access::Caller;
use crate::core::shared::error::CrmResult;
use crate::core::shared::extract::CrmJson;
use crate::core::shared::models::SuccessResponse;
use crate::core::shared::state::AppState;

pub async fn visible_origins_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<OriginBoard>> {
    let service = OriginsService::new(&state);
    Ok(Json(service.visible_board(&caller).await?))
}

pub async fn list_origins_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<OriginBoard>> {
    let service = OriginsService::new(&state);
    Ok(Json(service.full_board(&caller).await?))
}

pub async fn create_origin_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<CreateOriginRequest>,
) -> CrmResult<(StatusCode, Json<OriginResponse>)> {
    let service = OriginsService::new(&state);
    let origin = service.create_origin(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(OriginResponse { origin })))
}

pub async fn delete_origin_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<OriginIdRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = OriginsService::new(&state);
    service.delete_origin(&caller, request.id).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn add_member_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<AddMemberRequest>,
) -> CrmResult<Json<MemberResponse>> {
    let service = OriginsService::new(&state);
    let member = service.add_member(&caller, request).await?;
    Ok(Json(MemberResponse { member }))
}

pub async fn remove_member_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<RemoveMemberRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = OriginsService::new(&state);
    service.remove_member(&caller, request).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn list_members_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<ListMembersRequest>,
) -> CrmResult<Json<MemberListResponse>> {
    let service = OriginsService::new(&state);
    let members = service.list_members(&caller, request.origin_id).await?;
    Ok(Json(MemberListResponse { members }))
}
