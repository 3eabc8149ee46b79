use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("CSV stream error: {0}")]
    CsvStreamError(#[from] csv_async::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Header validation failed: {message}")]
    HeaderValidationError { message: String },

    #[error("Input stream failed before any record was committed: {message}")]
    StreamError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImportError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::CsvStreamError(_)
            | Self::IoError(_)
            | Self::HeaderValidationError { .. }
            | Self::StreamError { .. } => ErrorCategory::Input,
            Self::DatabaseError(_) | Self::StorageError { .. } => ErrorCategory::Storage,
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 連線問題通常重試即可恢復
            Self::DatabaseError(_) | Self::StorageError { .. } | Self::StreamError { .. } => {
                ErrorSeverity::Medium
            }
            Self::CsvError(_)
            | Self::CsvStreamError(_)
            | Self::HeaderValidationError { .. }
            | Self::SerializationError(_)
            | Self::ProcessingError { .. } => ErrorSeverity::High,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML file and command line flags, then run again"
            }
            ErrorCategory::Input => {
                "Make sure the file is a readable CSV export with every required column"
            }
            ErrorCategory::Storage => {
                "Verify the database URL and that the database is reachable, then retry"
            }
            ErrorCategory::Processing => "Inspect the logs for the failing row and fix the data",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HeaderValidationError { message } => format!("The CSV file was rejected: {}", message),
            Self::StreamError { message } => {
                format!("The upload ended before any movie was imported: {}", message)
            }
            Self::DatabaseError(_) | Self::StorageError { .. } => {
                format!("Could not write to the movie database ({})", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
