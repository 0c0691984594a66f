//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::state::AppState;
use axum::{
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.server.cors_origins.clone();
    let auth_state = state.clone();

    let scan_router = routes::scan_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::auth::auth_middleware,
    ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Root endpoint
        .route("/", get(root))
        // Booking API
        .nest("/scans", scan_router)
        // Add state
        .with_state(state)
        // Add middleware (applied in reverse order)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "roentgen-server"
    }))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "server": "Roentgen booking service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
