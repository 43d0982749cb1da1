use axum::{extract::State, routing::{get, post}, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::access::Caller;
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::extract::CrmJson;
use crate::core::shared::models::{normalize_email, Role};
use crate::core::shared::state::AppState;
use crate::security::jwt::AccessToken;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    CrmJson(request): CrmJson<LoginRequest>,
) -> CrmResult<Json<AccessToken>> {
    let email = normalize_email(&request.email);

    let Some(account) = state.store.find_account_by_email(&email).await? else {
        warn!("Login failed: unknown email");
        return Err(CrmError::AuthenticationRequired);
    };

    let hash = state
        .store
        .password_hash(account.id)
        .await?
        .ok_or(CrmError::AuthenticationRequired)?;

    let valid = state.passwords.verify(&request.password, &hash).map_err(|e| {
        error!("Password verification error for {}: {e}", account.id);
        CrmError::AuthenticationRequired
    })?;
    if !valid {
        warn!("Login failed: wrong password for {}", account.id);
        return Err(CrmError::AuthenticationRequired);
    }

    let token = state
        .jwt
        .issue_access_token(account.id, &account.email)
        .map_err(|e| CrmError::StorageFailure(e.to_string()))?;

    info!("Login: {} ({})", account.id, account.role);
    Ok(Json(token))
}

pub async fn me(Extension(caller): Extension<Caller>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: caller.id,
        email: caller.email,
        role: caller.role,
        manager_id: caller.manager_id,
    })
}
