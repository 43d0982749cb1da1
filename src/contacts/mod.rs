//! Contacts: scoped listing, creation and assignment, edits, deletion and
//! placement of contacts into origins.

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
        .route(
            "/api/contacts",
            get(list_contacts_handler).post(create_contact_handler),
        )
        .route("/api/contacts/all", get(list_all_contacts_handler))
        .route("/api/contacts/create", post(create_contact_handler))
        .route("/api/contacts/update", post(update_contact_handler))
        .route("/api/contacts/delete", post(delete_contact_handler))
        .route("/api/contacts/origin/:id", get(origin_contacts_handler))
        .route("/api/contacts/add-to-origin", post(add_to_origin_handler))
        .route(
            "/api/contacts/remove-from-origin",
            post(remove_from_origin_handler),
        )
}
