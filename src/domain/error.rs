// Error taxonomy for the trajectory analysis core

/// Errors surfaced by the analysis core and its backend adapters
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Fewer events/points than an operation needs
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The backend reported a failed computation while we were polling it
    #[error("Upstream task failed: {0}")]
    UpstreamTaskFailure(String),

    /// Transport failure or non-2xx status from the analysis API
    #[error("Network failure: {0}")]
    Network(String),

    /// Response body could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// A timestamp string was not a nanosecond epoch value
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The configured polling bound elapsed before the task resolved
    #[error("Task {task_id} still running after {elapsed_secs}s")]
    PollTimeout { task_id: String, elapsed_secs: u64 },

    /// The poll loop was dropped before it resolved
    #[error("Polling cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AnalysisError::Decode(err.to_string())
        } else {
            AnalysisError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
