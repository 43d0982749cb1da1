//! Bearer-token authentication for the HTTP API.
//!
//! Every request outside [`AuthConfig::allow_anonymous_paths`] must carry an
//! access token; the middleware resolves it to the current account and hands
//! handlers an explicit [`Caller`](crate::core::access::Caller).

pub mod config;
pub mod handlers;
pub mod middleware;

pub use config::AuthConfig;
pub use handlers::{configure, LoginRequest, ProfileResponse};
pub use middleware::{auth_middleware, authenticate};
