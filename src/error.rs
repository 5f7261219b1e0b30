use std::time::Duration;
use thiserror::Error;

/// Failures raised by a render backend while driving a browsing context.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to open browsing context at {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("browser command failed: {0}")]
    Command(String),
}

impl From<fantoccini::error::CmdError> for RenderError {
    fn from(error: fantoccini::error::CmdError) -> Self {
        RenderError::Command(error.to_string())
    }
}

/// Failures of a single unit of work in the fetch coordinator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("fetch coordinator has been shut down")]
    ShutDown,

    #[error("fetch task for {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

/// Errors surfaced by the service operations to their caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while packing batch artifacts into an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
