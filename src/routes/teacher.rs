use super::with_legacy_get;
use crate::{AppState, handlers};
use axum::{Router, routing::put};

/// Teacher Router Module
///
/// Grade entry, restricted to the teacher assigned to the enrolment's course.
pub fn teacher_routes(legacy_get: bool) -> Router<AppState> {
    Router::new()
        // PUT /set-mark/{enrolment_id}/{new_mark}
        .route(
            "/set-mark/{enrolment_id}/{new_mark}",
            with_legacy_get(put(handlers::set_mark), handlers::set_mark, legacy_get),
        )
}
