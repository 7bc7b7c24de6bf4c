use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Capacity exhausted: {message}")]
    Capacity { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Malformed event: {message}")]
    Malformed { message: String },

    #[error("Storage unavailable: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ParkingError>;

/// 呼叫端依此分支，而不是比對錯誤型別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Conflict,
    Capacity,
    NotFound,
    Malformed,
    Storage,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ParkingError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Capacity { .. } => ErrorKind::Capacity,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::Storage { .. }
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::CsvError(_) => ErrorKind::Storage,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ApiError(_) => ErrorKind::Config,
        }
    }

    /// 業務規則拒絕屬於預期結果，不會中斷整批事件
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::Capacity | ErrorKind::NotFound | ErrorKind::Malformed
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::Conflict | ErrorKind::NotFound => ErrorSeverity::Low,
            ErrorKind::Capacity => ErrorSeverity::Medium,
            ErrorKind::Malformed | ErrorKind::Config => ErrorSeverity::High,
            ErrorKind::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Conflict => "Check the sensor for duplicated or retransmitted events",
            ErrorKind::Capacity => "Retry once a spot has been released",
            ErrorKind::NotFound => "Verify the license plate or sector code and the event order",
            ErrorKind::Malformed => "Fix the event payload (event_type, license_plate, timestamps)",
            ErrorKind::Storage => "Check that the state directory exists and is writable",
            ErrorKind::Config => "Check the garage layout file and command line flags",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.kind() {
            ErrorKind::Conflict => format!("Request conflicts with current garage state: {}", self),
            ErrorKind::Capacity => format!("The garage cannot take this vehicle: {}", self),
            ErrorKind::NotFound => format!("Nothing matched the request: {}", self),
            ErrorKind::Malformed => format!("The event could not be understood: {}", self),
            ErrorKind::Storage => format!("Garage state could not be read or written: {}", self),
            ErrorKind::Config => format!("Configuration problem: {}", self),
        }
    }
}
