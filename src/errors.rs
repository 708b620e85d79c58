// SPDX-License-Identifier: MPL-2.0

//! Error types for the uploader

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level application error
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera backend errors
    Camera(BackendError),
    /// Upload pipeline errors
    Upload(UploadError),
    /// Configuration errors
    Config(String),
    /// Terminal setup or rendering errors
    Terminal(String),
    /// Filesystem / runtime I/O errors
    Io(String),
}

/// Snapshot encoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The buffer had no pixels
    EmptyImage,
    /// The encoder rejected the image
    Failed(String),
}

/// Snapshot transmission errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Encoding the frame failed before anything was sent
    Encode(EncodeError),
    /// The upload URL could not be built
    InvalidUrl(String),
    /// Connection, TLS or request failure
    Transport(String),
    /// The encode task panicked or was cancelled
    TaskFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Upload(e) => write!(f, "Upload error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::EmptyImage => write!(f, "Cannot encode an empty image"),
            EncodeError::Failed(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Encode(e) => write!(f, "{}", e),
            UploadError::InvalidUrl(msg) => write!(f, "Invalid upload URL: {}", msg),
            UploadError::Transport(msg) => write!(f, "Transport error: {}", msg),
            UploadError::TaskFailed(msg) => write!(f, "Upload task failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for EncodeError {}
impl std::error::Error for UploadError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<EncodeError> for UploadError {
    fn from(err: EncodeError) -> Self {
        UploadError::Encode(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err.to_string())
    }
}

