use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    HttpStatusError { status: u16, message: String },

    #[error("CSV rendering error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Aggregation was cancelled")]
    Cancelled,

    #[error("Aggregation timed out after {seconds}s")]
    TimedOut { seconds: u64 },
}

impl StatsError {
    /// Cancellation and timeouts are not branch failures and are never absorbed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(e) if e.is_timeout() => "The statistics API did not answer in time".to_string(),
            Self::ApiError(_) | Self::HttpStatusError { .. } => {
                format!("Could not reach the statistics API ({})", self)
            }
            Self::Cancelled => "Statistics computation was cancelled".to_string(),
            Self::TimedOut { seconds } => {
                format!("Statistics computation took longer than {}s", seconds)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check the API base URL and that the backend is running",
            Self::HttpStatusError { status: 401 | 403, .. } => {
                "Check that the API token is valid for this profile"
            }
            Self::HttpStatusError { .. } => "Check the backend logs for the failing endpoint",
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration value and retry"
            }
            Self::IoError(_) => "Check that the file exists and is readable",
            Self::SerializationError(_) => "Check that the snapshot is valid JSON",
            Self::TimedOut { .. } => "Increase timeout_seconds or lower the tree size",
            Self::CsvError(_) | Self::Cancelled => "Retry the command",
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
