//! Publish error types.

use thiserror::Error;

/// Errors that can occur while publishing a notebook.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The environment variable holding the integration token is not set.
    #[error("Configuration missing: environment variable {0} is not set")]
    MissingToken(String),

    /// Invalid publish configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external publish operation failed.
    ///
    /// `stderr` is the publisher's own error output, untouched.
    #[error("Publisher failed with exit code {exit_code}: {stderr}")]
    Publisher { exit_code: i32, stderr: String },

    /// The external publish operation timed out.
    #[error("Publish timed out after {0} seconds")]
    Timeout(u64),

    /// Process spawn error.
    #[error("Process error: {0}")]
    Process(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl PublishError {
    /// Returns true if the error was raised before the publisher was called.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PublishError::MissingToken(_) | PublishError::Configuration(_)
        )
    }
}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        PublishError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        PublishError::Json(e.to_string())
    }
}
