use crate::middleware::error_handling;
use crate::store::StoreError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("cannot start a conversation with yourself")]
    InvalidParticipants,

    #[error("{0}")]
    InvalidInput(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => AppError::Database(e),
            // Unique-pair conflicts are resolved by the conversation service;
            // one escaping here means a store invariant was broken.
            StoreError::Conflict => {
                tracing::error!("unhandled unique-pair conflict reached the error boundary");
                AppError::Internal
            }
        }
    }
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AppError::InvalidInput(reason.into())
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidParticipants | AppError::InvalidInput(_) => 400,
            AppError::Unauthenticated => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }

    /// Text that is safe to show to end users. Server-side failures are
    /// reported generically so driver errors never leak to clients.
    pub fn client_message(&self) -> String {
        if self.status_code() >= 500 {
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_4xx() {
        assert_eq!(AppError::InvalidParticipants.status_code(), 400);
        assert_eq!(AppError::invalid_input("empty").status_code(), 400);
        assert_eq!(AppError::Unauthenticated.status_code(), 401);
        assert_eq!(AppError::forbidden("nope").status_code(), 403);
        assert_eq!(AppError::NotFound("conversation").status_code(), 404);
    }

    #[test]
    fn server_errors_hide_details_from_clients() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "internal server error");
    }

    #[test]
    fn domain_messages_are_passed_through() {
        assert_eq!(
            AppError::NotFound("application").client_message(),
            "application not found"
        );
        assert_eq!(
            AppError::forbidden("only accepted applications may open a conversation")
                .client_message(),
            "only accepted applications may open a conversation"
        );
    }

    #[test]
    fn store_conflict_becomes_internal() {
        let err: AppError = StoreError::Conflict.into();
        assert!(matches!(err, AppError::Internal));
    }
}
