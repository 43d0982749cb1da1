use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use super::service::AccountsService;
use super::types::*;
use crate::core::access::Caller;
use crate::core::shared::error::CrmResult;
use crate::core::shared::extract::CrmJson;
use crate::core::shared::state::AppState;

pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<CreateUserRequest>,
) -> CrmResult<(StatusCode, Json<CreateUserResponse>)> {
    let service = AccountsService::new(&state);
    let account = service.create_user(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { account })))
}

pub async fn list_all_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<UserListResponse>> {
    let service = AccountsService::new(&state);
    let users = service.list_all_users(&caller).await?;
    Ok(Json(UserListResponse { users }))
}

pub async fn list_managers_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<ManagerListResponse>> {
    let service = AccountsService::new(&state);
    let managers = service.list_managers(&caller).await?;
    Ok(Json(ManagerListResponse { managers }))
}

pub async fn list_sellers_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> CrmResult<Json<SellerListResponse>> {
    let service = AccountsService::new(&state);
    let sellers = service.list_sellers(&caller).await?;
    Ok(Json(SellerListResponse { sellers }))
}

pub async fn account_emails_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<EmailLookupRequest>,
) -> CrmResult<Json<EmailLookupResponse>> {
    let service = AccountsService::new(&state);
    let emails = service.account_emails(&caller, &request.ids).await?;
    Ok(Json(EmailLookupResponse { emails }))
}
