//! Router Module Index
//!
//! Groups the routes by the roles allowed to call them. The grouping is for
//! readers only: the role check itself runs inside each handler through
//! `AuthUser::authorize`, with the allowed set hard-coded per operation.

use crate::AppState;
use axum::{handler::Handler, routing::MethodRouter};

/// Unauthenticated infrastructure routes (health).
pub mod public;

/// Listings open to admins, teachers and students alike.
pub mod shared;

/// Course administration (availability, teacher assignment).
pub mod admin;

/// Grade entry.
pub mod teacher;

/// Student self-service enrolment.
pub mod student;

/// with_legacy_get
///
/// Mutations are registered under verbs matching their semantics. When
/// `legacy_get` is set the same handler also answers `GET`, which is how the
/// first version of this API exposed every operation.
pub(crate) fn with_legacy_get<H, T>(
    route: MethodRouter<AppState>,
    handler: H,
    legacy_get: bool,
) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    if legacy_get { route.get(handler) } else { route }
}
