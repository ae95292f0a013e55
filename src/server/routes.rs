//! Router configuration for the HTTP API.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use super::AppState;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/scrape", post(handlers::scrape))
        .route("/health", get(handlers::health))
        .with_state(state)
}
