use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::upload::UploadError;

/// Errors surfaced by the HTTP handlers. A no-match is not an error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected upload (400)
    #[error("{0}")]
    InvalidInput(String),

    /// Transcoding or remote recognition failed (500)
    #[error("{0}")]
    RecognitionFailure(String),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::RecognitionFailure(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
