use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::orchestration::RegistrationError> for AppError {
    fn from(err: crate::orchestration::RegistrationError) -> Self {
        use crate::orchestration::RegistrationError;
        match err {
            RegistrationError::Placement(ref p) => AppError::Conflict(p.to_string()),
            RegistrationError::SponsorCodeUnknown(_) => AppError::BadRequest(err.to_string()),
            RegistrationError::SlotContended => AppError::Conflict(err.to_string()),
            RegistrationError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<crate::orchestration::DistributionError> for AppError {
    fn from(err: crate::orchestration::DistributionError) -> Self {
        use crate::orchestration::DistributionError;
        match err {
            DistributionError::Calculation(ref c) => AppError::NotFound(c.to_string()),
            DistributionError::MemberNotFound(_) => AppError::NotFound(err.to_string()),
            DistributionError::AlreadyDistributed(_) => AppError::Conflict(err.to_string()),
            DistributionError::NonPositiveAmount(_) => AppError::BadRequest(err.to_string()),
            DistributionError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
