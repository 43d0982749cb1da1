use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::access::Caller;
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::state::AppState;
use crate::security::jwt::extract_bearer_token;

/// Resolves the bearer token to the current account and stores it as a
/// [`Caller`] in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if state.auth.is_anonymous_allowed(&path) {
        return next.run(request).await;
    }

    match authenticate(&state, request.headers()).await {
        Ok(caller) => {
            debug!("{} {} as {} ({})", request.method(), path, caller.id, caller.role);
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> CrmResult<Caller> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(CrmError::AuthenticationRequired)?;

    let token = extract_bearer_token(header_value, &state.auth.bearer_prefix)
        .ok_or(CrmError::AuthenticationRequired)?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        warn!("Rejected token: {e}");
        CrmError::AuthenticationRequired
    })?;

    let account_id = claims.user_id().map_err(|e| {
        warn!("Rejected token: {e}");
        CrmError::AuthenticationRequired
    })?;

    match state.store.get_account(account_id).await? {
        Some(account) => Ok(Caller::from_account(&account)),
        None => {
            warn!("Token for unknown account {account_id}");
            Err(CrmError::AuthenticationRequired)
        }
    }
}
