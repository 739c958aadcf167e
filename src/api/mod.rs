//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{routing::get, Router};

use crate::AppState;

mod environments;
mod health;
mod nodes;

pub use environments::{AppliedFilters, EnvironmentsResponse};
pub use health::*;

/// All API routes, relative to `/api/v1`
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Topology endpoints
        .nest("/environments", environments::routes())
        .nest("/nodes", nodes::routes())
}

/// The API mounted under `/api/v1`, with state applied
pub fn router(state: AppState) -> Router {
    Router::new().nest("/api/v1", routes()).with_state(state)
}
