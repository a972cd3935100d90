use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ratewall_core::AppError;
use ratewall_domain::Denial;
use serde::Serialize;
use tracing::error;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            AppError::KeyNotFound(_) => (
                StatusCode::UNAUTHORIZED,
                "api key is not registered".to_owned(),
            ),
            AppError::InvalidPolicy(_) | AppError::Internal(_) => {
                error!(error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Builds the `429` response for a denied request.
pub fn denied_response(denial: &Denial) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse::new(denial.message())),
    )
        .into_response()
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use ratewall_domain::{DenialReason, SubjectKind};

    use super::*;

    #[test]
    fn caller_errors_map_to_client_statuses() {
        let cases = [
            (AppError::Validation("bad".to_owned()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".to_owned()), StatusCode::CONFLICT),
            (AppError::KeyNotFound("abc...".to_owned()), StatusCode::UNAUTHORIZED),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError(error).into_response().status(), status);
        }
    }

    #[test]
    fn server_faults_map_to_internal_server_error() {
        let cases = [
            AppError::Internal("redis down".to_owned()),
            AppError::InvalidPolicy("max requests must be greater than zero".to_owned()),
        ];

        for error in cases {
            assert_eq!(
                ApiError(error).into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn denials_map_to_too_many_requests() {
        let denial = Denial::new(SubjectKind::Ip, DenialReason::Blocked);
        assert_eq!(
            denied_response(&denial).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
