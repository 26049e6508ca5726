//! crates/translation_workflow_core/src/error.rs
//!
//! The error taxonomy surfaced by workflow actions. Every variant is recoverable at
//! the action boundary and leaves the project as it was before the action.

use crate::domain::Stage;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("The source document contains no extractable text")]
    EmptySource,

    #[error("Failed to read document {file_name}: {reason}")]
    ExtractionFailed { file_name: String, reason: String },

    #[error("No oracle API key is configured. Set GEMINI_API_KEY in the environment or .env file")]
    MissingCredential,

    #[error("Error: Invalid oracle API key. Please check your .env file")]
    InvalidCredential,

    #[error("Error communicating with the translation oracle: {0}")]
    OracleUnavailable(String),

    #[error("No final text to download")]
    NoFinalText,

    #[error("Error creating the document for download: {0}")]
    RenderFailure(String),

    #[error("This action requires the project to have reached {required:?} (current stage: {current:?})")]
    StageNotReached { required: Stage, current: Stage },

    #[error("A project is already in progress; archive it before starting a new one")]
    ProjectInProgress,

    #[error("Feedback rating must be between 1 and 5, got {0}")]
    InvalidFeedback(u8),
}

/// A convenience type alias for `Result<T, WorkflowError>`.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Provider error codes that identify a rejected API key.
const AUTH_REJECTION_MARKERS: [&str; 3] = ["API_KEY_INVALID", "PERMISSION_DENIED", "invalid_api_key"];

/// Whether a provider error message reads as a rejected API key.
pub fn is_auth_rejection(message: &str) -> bool {
    AUTH_REJECTION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

impl WorkflowError {
    /// Classifies a failed oracle call.
    pub fn from_oracle(err: PortError) -> Self {
        match err {
            PortError::Unauthorized(_) => WorkflowError::InvalidCredential,
            PortError::Timeout => {
                WorkflowError::OracleUnavailable("the request timed out".to_string())
            }
            other => {
                let message = other.to_string();
                if is_auth_rejection(&message) {
                    WorkflowError::InvalidCredential
                } else {
                    WorkflowError::OracleUnavailable(message)
                }
            }
        }
    }

    /// Classifies a failed document extraction.
    pub fn from_reader(file_name: &str, err: PortError) -> Self {
        match err {
            PortError::UnsupportedFormat(detail) => WorkflowError::UnsupportedFormat(detail),
            other => WorkflowError::ExtractionFailed {
                file_name: file_name.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
