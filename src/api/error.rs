//! Mapping from domain errors to HTTP responses.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub ok: bool,
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
pub struct HttpError {
    /// The HTTP status code
    pub status: StatusCode,
    /// Stable machine-readable code
    pub code: String,
    /// The error message
    pub message: String,
}

impl HttpError {
    fn new(status: StatusCode, code: &str, err: &Error) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            ok: false,
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        match &err {
            Error::PermissionDenied { .. } => {
                Self::new(StatusCode::FORBIDDEN, "permission_denied", &err)
            }
            Error::InvalidAcademicYear { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_academic_year", &err)
            }
            Error::InvalidInput { .. } | Error::InvalidAmount { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_input", &err)
            }
            Error::InvalidPaymentRequest { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_payment_request", &err)
            }
            Error::PaymentDenied { reason } => Self::new(StatusCode::CONFLICT, reason.code(), &err),
            Error::AcademicYearNotSet => {
                Self::new(StatusCode::CONFLICT, "academic_year_not_set", &err)
            }
            Error::InvalidPaymentTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_payment_transition", &err)
            }
            Error::StudentExists { .. } => Self::new(StatusCode::CONFLICT, "student_exists", &err),
            Error::StudentNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "student_not_found", &err)
            }
            Error::StageNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "stage_not_found", &err)
            }
            Error::PaymentNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "payment_not_found", &err)
            }
            Error::Database(_) | Error::Io(_) | Error::Config { .. } => {
                error!(error = %err, "Internal error while handling request");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal".to_string(),
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}
