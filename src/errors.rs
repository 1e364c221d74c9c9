// SPDX-License-Identifier: MPL-2.0

//! Error types for the barcode scanner

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera backend errors (enumeration, pipeline)
    Camera(String),
    /// A scan attempt failed
    Scan(ScanError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Why a single scan attempt ended without a payload
///
/// Every variant is terminal for the attempt. Nothing is retried; the user
/// presses "Detect Barcode" again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Camera access refused or restricted by the system
    PermissionDenied,
    /// Capture session setup failed at one of its steps
    Capture(CaptureError),
    /// Detection ran but found nothing
    NoSymbolFound,
    /// The detection engine itself failed
    Detection(String),
    /// Anything else
    Generic(String),
}

/// Capture session setup failures, one per setup step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No default device, or the device could not be opened or streamed
    DeviceUnavailable(String),
    /// The session refused the video input
    InputRejected(String),
    /// The session refused the metadata output
    OutputRejected(String),
}

impl CaptureError {
    /// Backend detail kept for logging; not shown on screen
    pub fn detail(&self) -> &str {
        match self {
            CaptureError::DeviceUnavailable(detail)
            | CaptureError::InputRejected(detail)
            | CaptureError::OutputRejected(detail) => detail,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(msg) => write!(f, "Camera error: {}", msg),
            AppError::Scan(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => write!(f, "Camera permission denied"),
            ScanError::Capture(e) => write!(f, "{}", e),
            ScanError::NoSymbolFound => write!(f, "{}", crate::constants::GENERIC_ERROR_MESSAGE),
            ScanError::Detection(msg) => write!(f, "{}", msg),
            ScanError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceUnavailable(_) => write!(f, "Failed to access camera"),
            CaptureError::InputRejected(_) => write!(f, "Failed to add camera input"),
            CaptureError::OutputRejected(_) => write!(f, "Failed to add metadata output"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}
impl std::error::Error for CaptureError {}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<CaptureError> for ScanError {
    fn from(err: CaptureError) -> Self {
        ScanError::Capture(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Scan(ScanError::Capture(err))
    }
}

impl From<crate::backends::camera::BackendError> for AppError {
    fn from(err: crate::backends::camera::BackendError) -> Self {
        AppError::Camera(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}
