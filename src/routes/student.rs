use super::with_legacy_get;
use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Student Router Module
///
/// Self-service enrolment. The student is always the caller; no route takes a
/// student id.
pub fn student_routes(legacy_get: bool) -> Router<AppState> {
    Router::new()
        // POST /enroll/{course_id}
        // Only available courses, at most one enrolment per course.
        .route(
            "/enroll/{course_id}",
            with_legacy_get(post(handlers::enrol), handlers::enrol, legacy_get),
        )
        // DELETE /withdraw/{course_id}
        // Only while the enrolment is ungraded.
        .route(
            "/withdraw/{course_id}",
            with_legacy_get(delete(handlers::withdraw), handlers::withdraw, legacy_get),
        )
}
