use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};

/// JSON error body returned by every HTTP route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
}

// map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::InvalidParticipants => ("validation_error", "INVALID_PARTICIPANTS"),
        AppError::InvalidInput(_) => ("validation_error", "INVALID_INPUT"),
        AppError::Unauthenticated => ("authentication_error", "UNAUTHENTICATED"),
        AppError::Forbidden(_) => ("authorization_error", "FORBIDDEN"),
        AppError::NotFound(_) => ("not_found_error", "NOT_FOUND"),
        AppError::Database(_) => ("server_error", "DATABASE_ERROR"),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            ("server_error", "INTERNAL_SERVER_ERROR")
        }
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let response = ErrorResponse {
        error: status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string(),
        message: err.client_message(),
        status: status.as_u16(),
        error_type: error_type.to_string(),
        code: code.to_string(),
    };

    (status, response)
}

pub fn into_response(err: &AppError) -> HttpResponse {
    let (status, body) = map_error(err);
    HttpResponse::build(status).json(body)
}
