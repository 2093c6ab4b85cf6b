//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use calc_core::CalcError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (malformed body, missing calculator)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Error raised by the registry or a calculator
    Calc(CalcError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Calc(e) => calc_status(e),
        }
    }

    pub fn body(&self) -> ApiError {
        match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => ApiError::new("INTERNAL_ERROR", msg.clone()),
            AppError::Calc(e) => {
                let error = ApiError::new(e.error_code(), e.to_string());
                match e {
                    CalcError::Dependency { missing, .. } => error.with_details(missing.join(", ")),
                    CalcError::InvalidInput { field, .. } | CalcError::MissingField { field } => {
                        error.with_details(field.clone())
                    }
                    _ => error,
                }
            }
        }
    }
}

/// HTTP status for a core error.
pub fn calc_status(error: &CalcError) -> StatusCode {
    match error {
        CalcError::NotFound { .. } => StatusCode::NOT_FOUND,
        CalcError::Dependency { .. } => StatusCode::FAILED_DEPENDENCY,
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::FAILED_DEPENDENCY {
            tracing::error!(status = %status, error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<CalcError> for AppError {
    fn from(err: CalcError) -> Self {
        AppError::Calc(err)
    }
}
