use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::directory::DirectoryError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Http(err) => {
                error!("directory request failed: {err}");
                ApiError::Internal("Failed to load schedules".into())
            }
            DirectoryError::InvalidUrl(err) => {
                error!("invalid directory URL: {err}");
                ApiError::Internal("Directory is misconfigured".into())
            }
        }
    }
}
