use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::service::ContactsService;
use super::types::*;
use crate::core::access::Caller;
use crate::core::shared::error::CrmResult;
use crate::core::shared::extract::{CrmJson, CrmPath};
use crate::core::shared::models::SuccessResponse;
use crate::core::shared::state::AppState;

pub async fn list_contacts_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<ContactListResponse>> {
    let service = ContactsService::new(&state);
    let contacts = service.list_contacts(&caller).await?;
    Ok(Json(ContactListResponse { contacts }))
}

pub async fn list_all_contacts_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<ContactSummaryListResponse>> {
    let service = ContactsService::new(&state);
    let contacts = service.list_compact(&caller).await?;
    Ok(Json(ContactSummaryListResponse { contacts }))
}

pub async fn create_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<CreateContactRequest>,
) -> CrmResult<(StatusCode, Json<ContactResponse>)> {
    let service = ContactsService::new(&state);
    let contact = service.create_contact(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(ContactResponse { contact })))
}

pub async fn update_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<UpdateContactRequest>,
) -> CrmResult<Json<ContactResponse>> {
    let service = ContactsService::new(&state);
    let contact = service.update_contact(&caller, request).await?;
    Ok(Json(ContactResponse { contact }))
}

pub async fn delete_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<ContactIdRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = ContactsService::new(&state);
    service.delete_contact(&caller, request.id).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn origin_contacts_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmPath(origin_id): CrmPath<Uuid>,
) -> CrmResult<Json<OriginContactListResponse>> {
    let service = ContactsService::new(&state);
    let contacts = service.contacts_in_origin(&caller, origin_id).await?;
    Ok(Json(OriginContactListResponse { contacts }))
}

pub async fn add_to_origin_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<PlacementRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = ContactsService::new(&state);
    service.add_to_origin(&caller, request).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn remove_from_origin_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<PlacementRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    let service = ContactsService::new(&state);
    service.remove_from_origin(&caller, request).await?;
    Ok(Json(SuccessResponse::OK))
}
