use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::audio::AudioError;
use crate::cloner::CloneError;
use crate::storage::StorageError;

/// Error returned by every handler, rendered as `{success: false, message}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    ModelNotInitialized(String),
    #[error("{0}")]
    Synthesis(String),
    #[error("{0}")]
    AudioProcessing(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelNotInitialized(_)
            | ApiError::Synthesis(_)
            | ApiError::AudioProcessing(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::warn!("Request failed: {self}");
        }
        let body = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedExtension | StorageError::InvalidName(_) => {
                ApiError::Validation(err.to_string())
            }
            StorageError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::Io(_) => ApiError::Internal(format!("Error occurred: {err}")),
        }
    }
}

impl From<AudioError> for ApiError {
    fn from(err: AudioError) -> Self {
        ApiError::AudioProcessing(format!("Voice feature analysis failed: {err}"))
    }
}

impl From<CloneError> for ApiError {
    fn from(err: CloneError) -> Self {
        match &err {
            CloneError::ModelNotInitialized => ApiError::ModelNotInitialized(err.to_string()),
            CloneError::Synthesis(_) if err.audio_error().is_some() => {
                ApiError::AudioProcessing(err.to_string())
            }
            CloneError::Synthesis(_) => ApiError::Synthesis(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::Validation(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        ApiError::Validation(format!("Expected a multipart upload: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid JSON body: {}", err.body_text()))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Worker task failed: {err}"))
    }
}
