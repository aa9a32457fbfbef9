use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints. All content, including published content, requires a
/// signed-in caller, so only the health check lives here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
}
