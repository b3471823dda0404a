//! HTTP error mapping
//!
//! Core errors carry enough structure to pick a status code; the body is
//! always `{"error": ...}`, with `duplicateRequest: true` added when an
//! identical pending request caused the rejection.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rota_core::Error as CoreError;
use serde_json::json;
use tracing::error;

pub struct ApiError(pub CoreError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            CoreError::PermissionDenied(msg) => {
                (StatusCode::FORBIDDEN, json!({ "error": msg }))
            }
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            CoreError::Validation {
                reason,
                duplicate_request,
            } => {
                let body = if *duplicate_request {
                    json!({ "error": reason, "duplicateRequest": true })
                } else {
                    json!({ "error": reason })
                };
                (StatusCode::BAD_REQUEST, body)
            }
            CoreError::InvalidOperation(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            CoreError::Conflict(_) => (
                StatusCode::CONFLICT,
                json!({ "error": "The room was modified concurrently, please retry" }),
            ),
            CoreError::Database(_) | CoreError::Io(_) | CoreError::Serialization(_) => {
                error!(error = %self.0, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_core::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::validation("x"), StatusCode::BAD_REQUEST),
            (Error::InvalidOperation("x".into()), StatusCode::BAD_REQUEST),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_duplicate_flag_maps_to_bad_request() {
        let response = ApiError(Error::duplicate("already asked")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
