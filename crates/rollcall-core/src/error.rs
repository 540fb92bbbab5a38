use thiserror::Error;

/// Application-wide error types for rollcall.
#[derive(Error, Debug)]
pub enum AppError {
    /// Navigating to an address failed.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// A page or element did not appear in time.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// The expected listing or pagination structure was not found.
    #[error("Structure not found: {0}")]
    StructureNotFound(String),

    /// Reading or writing a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No authenticated browsing session could be obtained.
    #[error("Session error: {0}")]
    Session(String),

    /// The browser could not be launched or driven.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid configuration or input file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is local to one page or company and the
    /// run should move on to the next item.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Navigation(_) | AppError::Timeout(_))
    }

    /// Returns true if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Session(_) | AppError::Browser(_))
    }
}
