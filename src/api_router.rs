//! Every authenticated API route, merged from the feature modules.

use axum::Router;
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::security::auth_api::configure())
        .merge(crate::accounts::configure())
        .merge(crate::contacts::configure())
        .merge(crate::tags::configure())
        .merge(crate::origins::configure())
        .merge(crate::pipeline::configure())
}
