use thiserror::Error;

/// Main error type for ECHONET Lite operations
#[derive(Error, Debug)]
pub enum EnliteError {
    #[error("Invalid instance code: {instance}")]
    InvalidIdentity { instance: u16 },

    #[error("Incomplete parameters: {0}")]
    IncompleteParameters(String),

    #[error("GetRes timeout")]
    ReadTimeout,

    #[error("Transmission failed: {0}")]
    SendFailed(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnliteError {
    /// Whether a property read should be attempted again after this error
    ///
    /// Only a missing response and a transmission failure reported by the
    /// transport are transient; everything else is surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReadTimeout | Self::SendFailed(_))
    }
}

/// Result type alias for ECHONET Lite operations
pub type EnliteResult<T> = Result<T, EnliteError>;
