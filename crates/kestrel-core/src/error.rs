use thiserror::Error;

/// Application-wide error types for Kestrel.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a search page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Headless browser failed to launch or render.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// A site profile is malformed (bad selector, pattern, or base URL).
    #[error("Profile error: {0}")]
    ProfileError(String),

    /// Invalid run configuration (item cap, thresholds, env vars).
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Writing records to an output sink failed.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
                    || msg.contains("HTTP 5")
                    || msg.contains("HTTP 429")
            }
            _ => false,
        }
    }
}
