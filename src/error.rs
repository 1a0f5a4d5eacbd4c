use axum::{
    Json,
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ExecResult;

/// AppError
///
/// The closed failure taxonomy of the API. Every variant renders as an
/// [`ExecResult`] envelope, so clients never see a bare status code.
///
/// Storage and encoding diagnostics are logged when the response is built and
/// replaced by a fixed public message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or non-numeric identifier in the path or the `user-id` header.
    #[error("{0}")]
    Validation(String),

    /// The caller's role is not allowed to run the operation. Unknown users land
    /// here too, with the same message.
    #[error("Unauthorised access (User ID: {user_id}).")]
    Unauthorized { user_id: i64 },

    #[error("{0}")]
    NotFound(String),

    /// The path exists but not under the request's method.
    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// A precondition on the current row state was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("response encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal storage error.";

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `errorNumber` placed in the envelope.
    pub fn error_number(&self) -> i32 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized { .. } => 401,
            AppError::NotFound(_) => 404,
            AppError::MethodNotAllowed
            | AppError::Conflict(_)
            | AppError::Storage(_)
            | AppError::Encoding(_) => ExecResult::GENERIC_FAILURE,
        }
    }

    /// The client-visible message. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) | AppError::Encoding(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_envelope(&self) -> ExecResult {
        ExecResult::failure(self.error_number(), self.public_message())
    }
}

/// Undecodable path segments are bad input like any other malformed id.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(detail = %rejection.body_text(), "path extraction rejected");
        AppError::Validation("Invalid path parameter.".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = self.to_envelope();
        match &self {
            AppError::Storage(e) => tracing::error!(error = ?e, "storage failure"),
            AppError::Encoding(e) => tracing::error!(error = ?e, "response encoding failure"),
            other => tracing::warn!(
                error_number = envelope.error_number,
                message = %other,
                "request rejected"
            ),
        }
        (self.status_code(), Json(envelope)).into_response()
    }
}

/// Renders a successful envelope with HTTP 200.
impl IntoResponse for ExecResult {
    fn into_response(self) -> Response {
        tracing::debug!(message = %self.output_message, "request completed");
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// ApiResult
///
/// What every handler returns.
pub type ApiResult = Result<ExecResult, AppError>;

/// ConfigError
///
/// Startup configuration failures. Surfaced by `main` before anything binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_and_error_number() {
        let cases = [
            (AppError::Validation("Invalid Course ID.".into()), StatusCode::BAD_REQUEST, 400),
            (AppError::Unauthorized { user_id: 7 }, StatusCode::UNAUTHORIZED, 401),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND, 404),
            (AppError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED, -1),
            (AppError::Conflict("busy".into()), StatusCode::CONFLICT, -1),
            (AppError::Storage(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR, -1),
        ];

        for (error, status, number) in cases {
            assert_eq!(error.status_code(), status);
            assert_eq!(error.error_number(), number);
        }
    }

    #[test]
    fn storage_diagnostics_are_not_exposed() {
        let envelope = AppError::Storage(sqlx::Error::PoolTimedOut).to_envelope();

        assert_eq!(envelope.output_message, INTERNAL_ERROR_MESSAGE);
        assert!(envelope.output_object.is_none());
    }

    #[test]
    fn unauthorized_message_names_only_the_caller() {
        let envelope = AppError::Unauthorized { user_id: 999 }.to_envelope();
        assert_eq!(envelope.output_message, "Unauthorised access (User ID: 999).");
    }
}
