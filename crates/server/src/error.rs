//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("file is empty")]
    EmptyBody,

    #[error("file exceeds maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("only one file supported for upload using multipart")]
    MultipleFileParts,

    #[error("file name is empty in multipart upload request")]
    BlankFileName,

    #[error("malformed multipart request: {0}")]
    Multipart(String),

    #[error("unsupported content type {0:?}: expected multipart/form-data, application/x-www-form-urlencoded or application/octet-stream")]
    UnsupportedMediaType(String),

    #[error("no responder for Accept header: {0}")]
    NotAcceptable(String),

    #[error("no files processed by request processor")]
    NothingUploaded,

    #[error("artifact stored at {actual} but request addressed {expected}")]
    LocationMismatch { expected: String, actual: String },

    #[error("bad path: {0}")]
    BadPath(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(courier_core::Error),
}

impl From<courier_core::Error> for ApiError {
    fn from(err: courier_core::Error) -> Self {
        match err {
            courier_core::Error::MissingParameter(name) => Self::MissingField(name),
            courier_core::Error::InvalidSegment { .. } => Self::InvalidField(err.to_string()),
            other => Self::Core(other),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidField(_) => "invalid_field",
            Self::EmptyBody => "empty_body",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::MultipleFileParts => "multiple_file_parts",
            Self::BlankFileName => "blank_file_name",
            Self::Multipart(_) => "malformed_multipart",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::NotAcceptable(_) => "not_acceptable",
            Self::NothingUploaded => "nothing_uploaded",
            Self::LocationMismatch { .. } => "location_mismatch",
            Self::BadPath(_) => "bad_path",
            Self::Internal(_) => "internal_error",
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => "not_found",
                StorageError::Expired(_) => "expired",
                StorageError::InvalidKey(_) | StorageError::Domain(_) => "invalid_key",
                _ => "storage_error",
            },
            Self::Core(_) => "core_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_)
            | Self::InvalidField(_)
            | Self::EmptyBody
            | Self::MultipleFileParts
            | Self::BlankFileName
            | Self::Multipart(_)
            | Self::NothingUploaded
            | Self::BadPath(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::LocationMismatch { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Expired(_) => StatusCode::GONE,
                StorageError::InvalidKey(_) | StorageError::Domain(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
