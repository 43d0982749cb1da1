//! User and team administration: account creation by the Owner, team
//! listings and the batched email lookup used to label contact rows.

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
        .route("/api/admin/create-user", post(create_user_handler))
        .route("/api/admin/list-all-users", get(list_all_users_handler))
        .route("/api/admin/list-managers", get(list_managers_handler))
        .route("/api/manager/list-sellers", get(list_sellers_handler))
        .route("/api/accounts/emails", post(account_emails_handler))
}
