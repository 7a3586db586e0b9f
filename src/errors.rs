use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::migrate::MigrateError;
use tokio::io;

use crate::storage::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("We couldn't read your upload. Please send it as multipart/form-data.")]
    MalformedUpload,
    #[error("This file is too big! Please upload something smaller.")]
    UploadTooLarge,
    #[error("You need to attach a file in the `file` field.")]
    MissingFile,
    #[error("We couldn't find this file ID! Please re-check and try again.")]
    FileNotFound,
    #[error("This file has expired and is no longer available.")]
    FileExpired,

    #[error("We couldn't store your file right now. Please try again later.")]
    UploadFailed(#[source] StoreError),
    #[error("We couldn't save your file details right now. Please try again later.")]
    MetadataWriteFailed(#[source] sqlx::Error),
    #[error("Something went wrong on our side! Please try again later.")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedUpload | Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::FileExpired => StatusCode::GONE,
            Self::UploadFailed(_) | Self::MetadataWriteFailed(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MalformedUpload => "malformed-upload",
            AppError::UploadTooLarge => "upload-too-large",
            AppError::MissingFile => "missing-file",
            AppError::FileNotFound => "file-not-found",
            AppError::FileExpired => "file-expired",
            AppError::UploadFailed(_) => "upload-failed",
            AppError::MetadataWriteFailed(_) => "metadata-write-failed",
            AppError::Other(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();

        if code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{self:?}");
        }

        let res = ErrorResponse {
            error_code: self.error_code().to_string(),
            error: self.to_string(),
        };
        (code, Json(res)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<MigrateError> for AppError {
    fn from(value: MigrateError) -> Self {
        Self::Other(value.into())
    }
}

impl From<io::Error> for AppError {
    fn from(value: io::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(value: toml::de::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<MultipartError> for AppError {
    fn from(value: MultipartError) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::UploadTooLarge
        } else {
            tracing::debug!("multipart parse failure: {}", value.body_text());
            Self::MalformedUpload
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub error: String,
}
