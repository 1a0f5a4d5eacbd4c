use axum::{
    extract::{FromRequestParts, Path},
    http::{HeaderMap, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::{error::AppError, models::Role, repository::Repository};

/// The header carrying the caller's numeric user id.
pub const USER_ID_HEADER: &str = "user-id";

/// AuthUser
///
/// The caller identity taken from the `user-id` header. Identity is trusted as
/// supplied; there is no credential check. Extraction only parses the header and
/// never touches storage, so malformed requests are rejected before any query runs.
///
/// The role is resolved lazily by [`AuthUser::authorize`], once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

impl AuthUser {
    /// Parses the identity from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|id| AuthUser { id })
            .ok_or_else(|| {
                AppError::Validation(
                    "Invalid User ID. Probably due to missing [user-id] Header.".to_string(),
                )
            })
    }

    /// authorize
    ///
    /// The Authorization Gate. Resolves the caller's role and admits it only if it
    /// is one of `allowed`.
    ///
    /// * storage failure: `AppError::Storage` (HTTP 500), nothing else runs.
    /// * unknown user or role outside `allowed`: `AppError::Unauthorized` (HTTP 401).
    ///   The response is identical in both cases so it does not reveal whether the
    ///   user exists.
    /// * otherwise the resolved role, for role-specific branching.
    pub async fn authorize(
        &self,
        repo: &dyn Repository,
        allowed: &[Role],
    ) -> Result<Role, AppError> {
        let role = repo.resolve_role(self.id).await?;
        tracing::info!(user_id = self.id, role = ?role, "resolved caller role");

        match role {
            Some(role) if allowed.contains(&role) => Ok(role),
            _ => Err(AppError::Unauthorized { user_id: self.id }),
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Lets handlers take `AuthUser` as an argument. Rejects with the envelope for a
/// 400 when the header is absent or not an integer.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// PathParams
///
/// `Path` with the envelope as its rejection. Segments arrive as raw strings
/// and are validated by [`parse_id`] / [`parse_mark`]; this only fails when
/// the segment cannot be decoded at all (e.g. `%FF`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParams<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(PathParams(params))
    }
}

/// parse_id
///
/// Validates one path-supplied identifier. `label` names it in the error message,
/// e.g. "Course ID".
pub fn parse_id(raw: &str, label: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Invalid {label}.")))
}

/// parse_mark
///
/// Marks are whole numbers.
pub fn parse_mark(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::Validation("Invalid New Mark value.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn numeric_header_is_accepted() {
        assert_eq!(AuthUser::from_headers(&headers_with("42")).unwrap(), AuthUser { id: 42 });
    }

    #[test]
    fn missing_or_malformed_header_is_a_validation_error() {
        for headers in [HeaderMap::new(), headers_with("abc"), headers_with("12abc"), headers_with("")] {
            let err = AuthUser::from_headers(&headers).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn path_ids_name_the_offending_field() {
        assert_eq!(parse_id("5", "Course ID").unwrap(), 5);
        let err = parse_id("five", "Course ID").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Course ID.");
    }

    #[test]
    fn marks_must_be_integers() {
        assert_eq!(parse_mark("85").unwrap(), 85);
        assert!(parse_mark("85.5").is_err());
    }
}
