use super::with_legacy_get;
use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Course administration. Every handler here admits the admin role only.
pub fn admin_routes(legacy_get: bool) -> Router<AppState> {
    Router::new()
        // GET /all
        // Every course, including unavailable ones.
        .route("/all", get(handlers::list_all_courses))
        // POST /enable/{course_id} and POST /disable/{course_id}
        // Flip the availability flag; a no-op transition is rejected.
        .route(
            "/enable/{course_id}",
            with_legacy_get(post(handlers::enable_course), handlers::enable_course, legacy_get),
        )
        .route(
            "/disable/{course_id}",
            with_legacy_get(post(handlers::disable_course), handlers::disable_course, legacy_get),
        )
        // POST /assign/{course_id}/{teacher_id} and POST /unassign/{course_id}/{teacher_id}
        .route(
            "/assign/{course_id}/{teacher_id}",
            with_legacy_get(post(handlers::assign_teacher), handlers::assign_teacher, legacy_get),
        )
        .route(
            "/unassign/{course_id}/{teacher_id}",
            with_legacy_get(
                post(handlers::unassign_teacher),
                handlers::unassign_teacher,
                legacy_get,
            ),
        )
}
