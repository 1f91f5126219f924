//! Mapping of handler failures to HTTP responses.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::features::DecodeError;
use crate::geo::CoordinateError;
use crate::record_store::StoreError;

use super::metrics::record_error;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const FEATURE_EXTRACTION_ERROR_MESSAGE: &str = "Error extracting audio features";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Error classified by the record store, forwarded with its own status.
    #[error("{message}")]
    Store { status: u16, message: String },

    /// Generic failure; details are logged, never returned.
    #[error("{0}")]
    Internal(String),

    /// Unreadable multipart body, including bodies over the upload limit.
    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal() -> Self {
        ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
    }

    pub fn feature_extraction(err: &DecodeError) -> Self {
        error!("Audio feature extraction failed: {}", err);
        record_error("feature_extraction");
        ApiError::Internal(FEATURE_EXTRACTION_ERROR_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(err) => err.status(),
        }
    }
}

impl From<CoordinateError> for ApiError {
    fn from(err: CoordinateError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Api { status, message } => ApiError::Store { status, message },
            other => {
                error!("Record store failure: {}", other);
                record_error("store");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
