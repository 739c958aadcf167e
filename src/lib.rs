//! Trento Web Library
//!
//! Environment and node topology over a Consul discovery backend: filtered
//! node listings grouped by datacenter, aggregated node health, filter
//! vocabularies from the KV store and per-node check reports.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use services::Backend;
pub use utils::{AppError, AppResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Discovery backend handle
    pub backend: Backend,
}
