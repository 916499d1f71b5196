//! HTTP surface of the store uptime service

pub mod api;
pub mod config;

pub use api::{create_router, AppState};
pub use config::ServiceConfig;
