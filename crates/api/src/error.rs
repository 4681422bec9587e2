//! Error and success envelopes.
//!
//! Every JSON response is either `{"success": true, "data": ...}` or
//! `{"success": false, "error": "...", "code": "...", "details"?: [...]}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed")]
    ValidationDetails(Vec<ValidationDetail>),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Rate limited")]
    RateLimited { retry_after: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl ValidationDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) | ApiError::ValidationDetails(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationDetails(vec![ValidationDetail::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut retry_after = None;

        let (code, message, details) = match self {
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Validation(msg) => ("validation_error", msg, None),
            ApiError::ValidationDetails(details) => {
                let message = match details.as_slice() {
                    [single] => single.message.clone(),
                    many => format!("{} validation errors", many.len()),
                };
                ("validation_error", message, Some(details))
            }
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg, None),
            ApiError::RateLimited { retry_after: secs } => {
                retry_after = Some(secs);
                (
                    "rate_limited",
                    "Too many requests. Please try again later.".to_string(),
                    None,
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("internal_error", "An internal error occurred".to_string(), None)
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = ErrorBody {
            success: false,
            error: message,
            code,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::Conflict("Resource already exists".into()),
                Some("23503") => ApiError::NotFound("Referenced resource not found".into()),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationDetails(details)
    }
}

impl From<persistence::repositories::UserWriteError> for ApiError {
    fn from(err: persistence::repositories::UserWriteError) -> Self {
        use persistence::repositories::UserWriteError;
        match err {
            UserWriteError::NotFound => ApiError::NotFound("User not found".into()),
            UserWriteError::LastAdmin => {
                ApiError::Conflict("The last administrator cannot be removed or demoted".into())
            }
            UserWriteError::Database(e) => e.into(),
        }
    }
}

impl From<shared::password::PasswordError> for ApiError {
    fn from(err: shared::password::PasswordError) -> Self {
        use shared::password::PasswordError;
        match err {
            PasswordError::TooShort(_) | PasswordError::TooLong(_) => ApiError::field("password", err.to_string()),
            PasswordError::ConfirmationMismatch => ApiError::field("password_confirm", err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<domain::services::ArMarkerError> for ApiError {
    fn from(err: domain::services::ArMarkerError) -> Self {
        use domain::services::ArMarkerError;
        match err {
            ArMarkerError::Encode(msg) => ApiError::Internal(msg),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<theme_builder::RenderError> for ApiError {
    fn from(err: theme_builder::RenderError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<crate::services::storage::StorageError> for ApiError {
    fn from(err: crate::services::storage::StorageError) -> Self {
        use crate::services::storage::StorageError;
        match err {
            StorageError::ExtensionNotAllowed(_) | StorageError::EmptyFile => {
                ApiError::field("images", err.to_string())
            }
            StorageError::TooLarge(_) => ApiError::PayloadTooLarge(err.to_string()),
            StorageError::InvalidPath => ApiError::NotFound("File not found".into()),
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound("File not found".into())
            }
            StorageError::Io(e) => ApiError::Internal(format!("Storage error: {}", e)),
        }
    }
}

impl From<shared::csrf::CsrfError> for ApiError {
    fn from(err: shared::csrf::CsrfError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// `201 Created` with the success envelope.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ApiResponse::ok(data))
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge("x".into()).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::RateLimited { retry_after: 3 }.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::ServiceUnavailable("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let body = body_json(ApiError::Conflict("Slug already in use".into()).into_response()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Slug already in use");
        assert_eq!(body["code"], "conflict");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_message() {
        let body = body_json(ApiError::Internal("password=hunter2".into()).into_response()).await;
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[tokio::test]
    async fn test_field_error_details() {
        let body = body_json(ApiError::field("name", "Name is required").into_response()).await;
        assert_eq!(body["error"], "Name is required");
        assert_eq!(body["details"][0]["field"], "name");
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::ok(serde_json::json!({"id": 1})).into_response();
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"success": true, "data": {"id": 1}}));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[test]
    fn test_from_last_admin() {
        let error: ApiError = persistence::repositories::UserWriteError::LastAdmin.into();
        assert!(matches!(error, ApiError::Conflict(_)));
    }
}
