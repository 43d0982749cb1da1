//! Origins (named pipelines) and their memberships.

mod handlers;
mod service;
mod types;

pub use handlers::*;
pub use service::*;
pub use types::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/origins", get(visible_origins_handler))
        .route("/api/origins/user", get(visible_origins_handler))
        .route("/api/origins/list", get(list_origins_handler))
        .route("/api/origins/create", post(create_origin_handler))
        .route("/api/origins/delete", post(delete_origin_handler))
        .route("/api/origins/members/add", post(add_member_handler))
        .route("/api/origins/members/remove", post(remove_member_handler))
        .route("/api/origins/members/list", post(list_members_handler))
}
