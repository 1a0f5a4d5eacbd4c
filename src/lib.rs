use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing, grouped by the roles each operation admits.
pub mod routes;
use routes::{admin, public, shared, student, teacher};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiResult, AppError};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates the `#[utoipa::path]` handlers and `ToSchema` models into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::list_available_courses, handlers::list_enrolments, handlers::list_all_courses,
        handlers::enable_course, handlers::disable_course, handlers::assign_teacher,
        handlers::unassign_teacher, handlers::set_mark, handlers::enrol, handlers::withdraw
    ),
    components(
        schemas(
            models::ExecResult, models::Role, models::User, models::Course,
            models::CourseListing, models::Enrolment, models::EnrolmentDetail,
        )
    ),
    tags(
        (name = "enrolment-portal", description = "Role-based course enrolment API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single state container shared by every request. The storage client is
/// constructed at startup and injected here; there is no ambient global pool.
#[derive(Clone)]
pub struct AppState {
    /// Storage client behind the `Repository` trait.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Handlers pull only the component they need out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Unknown routes still answer with the envelope.
async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found.".to_string())
}

/// Known routes called with the wrong verb, e.g. a legacy `GET` while the
/// aliases are switched off.
async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// create_router
///
/// Assembles the routing structure, applies the observability and CORS layers,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let legacy_get = state.config.legacy_get_routes;

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(shared::shared_routes())
        .merge(admin::admin_routes(legacy_get))
        .merge(teacher::teacher_routes(legacy_get))
        .merge(student::student_routes(legacy_get))
        .fallback(route_not_found)
        // Must follow the merges: it only reaches routes registered so far.
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    // Request id is generated first so the trace span and the response both carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span: method, uri and the `x-request-id`, so every log
/// line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
