//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// The targeted rows are still referenced.
    #[error("{0}")]
    InUse(String),

    /// The request could not be resolved.
    #[error("{0}")]
    BadRequest(String),

    /// Protection failed for reasons unrelated to the request.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InUse(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InUse(_) => "DATA_IN_USE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false.
    pub success: bool,
    /// Error details.
    pub error: ErrorDetail,
}

/// Code and message of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        (self.status(), Json(body)).into_response()
    }
}

impl From<refguard_core::Error> for AppError {
    fn from(err: refguard_core::Error) -> Self {
        if err.is_bad_request() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refguard_core::{Error, ResolveError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::InUse("in use".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let bad: AppError = Error::Resolve(ResolveError::ModuleNotFound("unicorn".into())).into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert!(bad.to_string().contains("module unicorn is not found"));

        let internal: AppError = Error::NotMigrated.into();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from(&AppError::InUse("in use".into()));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "success": false,
                "error": { "code": "DATA_IN_USE", "message": "in use" }
            })
        );
    }
}
