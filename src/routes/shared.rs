use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Shared Router Module
///
/// Read-only listings callable by every role. `/enrolments` filters its rows by
/// the caller's role.
pub fn shared_routes() -> Router<AppState> {
    Router::new()
        // GET / and GET /available
        // Courses with availability on, joined with teacher names.
        .route("/", get(handlers::index))
        .route("/available", get(handlers::list_available_courses))
        // GET /enrolments
        .route("/enrolments", get(handlers::list_enrolments))
}
