// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner application

use crate::backends::camera::BackendError;
use crate::config::PrefsError;
use crate::lookup::LookupError;
use crate::scanner::{CaptureError, ScanError};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Camera backend errors
    #[error("Camera error: {0}")]
    Camera(#[from] BackendError),
    /// A scan session could not start
    #[error("{0}")]
    Scan(#[from] ScanError),
    /// Still capture failed
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Lookup service errors (user-facing text)
    #[error("{0}")]
    Lookup(#[from] LookupError),
    /// Preference persistence errors
    #[error("Preferences error: {0}")]
    Prefs(#[from] PrefsError),
    /// Terminal and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_texts_pass_through() {
        let err: AppError = LookupError::AnalysisFailed.into();
        assert_eq!(err.to_string(), "Failed to analyze ingredients");

        let err: AppError = ScanError::PermissionDenied.into();
        assert_eq!(
            err.to_string(),
            "Failed to access camera. Please check permissions."
        );
    }

    #[test]
    fn test_plain_messages_convert() {
        let err: AppError = "No cameras found".into();
        assert!(matches!(err, AppError::Other(ref m) if m == "No cameras found"));
        assert_eq!(AppError::from(String::from("Scan cancelled")).to_string(), "Scan cancelled");
    }

    #[test]
    fn test_backend_error_is_prefixed() {
        let err: AppError = BackendError::StreamClosed.into();
        assert_eq!(err.to_string(), "Camera error: Camera stream is closed");
    }
}
