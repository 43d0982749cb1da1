pub mod accounts;
pub mod api_router;
pub mod contacts;
pub mod core;
pub mod main_module;
pub mod origins;
pub mod pipeline;
pub mod security;
pub mod tags;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
pub use crate::main_module::build_router;
