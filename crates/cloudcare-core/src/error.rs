use thiserror::Error;

/// Core error types for CloudCare operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("Invalid DateTime: {0}")]
    InvalidDateTime(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// The delivery queue behind a subscription is gone.
    #[error("Emergency queue closed")]
    QueueClosed,
}

impl CoreError {
    /// Create a new InvalidEvent error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent(message.into())
    }

    /// Create a new InvalidDateTime error
    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
