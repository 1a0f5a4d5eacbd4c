use crate::{AppState, models::ExecResult};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no `user-id` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; never touches storage.
        .route("/health", get(|| async { ExecResult::done("ok") }))
}
