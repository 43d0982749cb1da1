pub mod access;
pub mod config;
pub mod shared;
pub mod store;
