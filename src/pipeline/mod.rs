//! Pipeline stages: creation, deletion, ordering and moving contacts
//! between stages.

mod handlers;
pub mod ordering;
mod service;
mod types;

pub use handlers::*;
pub use service::*;
pub use types::*;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stages/create", post(create_stage_handler))
        .route("/api/stages/delete", post(delete_stage_handler))
        .route("/api/stages/reorder", post(reorder_stages_handler))
        .route("/api/stages/move", post(move_stage_handler))
        .route("/api/contacts/update-stage", post(update_contact_stage_handler))
}
