use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Object store connection error: {message}")]
    StoreConnection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Destination connection error: {message}")]
    DestinationConnection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Configuration,
    Network,
    State,
    Data,
    System,
}

/// 錯誤嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TransferError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn store<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::StoreConnection {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn destination<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::DestinationConnection {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Configuration { .. } | Self::Toml(_) => ErrorCategory::Configuration,
            Self::StoreConnection { .. } | Self::DestinationConnection { .. } => {
                ErrorCategory::Network
            }
            Self::InvalidState { .. } | Self::Cancelled => ErrorCategory::State,
            Self::Serialization(_) | Self::Csv(_) | Self::Decode(_) => ErrorCategory::Data,
            Self::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::State => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Validation | ErrorCategory::Configuration | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Check the mapping file: every row needs a folder name and a category ID",
            Self::Configuration { .. } | Self::Toml(_) => {
                "Review the configuration file and make sure all required fields are set"
            }
            Self::StoreConnection { .. } => {
                "Verify the bucket name, region and access keys, then run with --test-connection"
            }
            Self::DestinationConnection { .. } => {
                "Verify the destination base URL and credentials, then run with --test-connection"
            }
            Self::InvalidState { .. } => "Wait for the running transfer to finish or stop it first",
            Self::Cancelled => "The transfer was stopped; run it again to process the remaining folders",
            Self::Io(_) => "Check file paths and permissions",
            Self::Serialization(_) | Self::Decode(_) => "The payload could not be encoded; check the source file",
            Self::Csv(_) => "Make sure the mapping file is valid CSV with a header row",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Validation { field, reason } => format!("Invalid input for '{}': {}", field, reason),
            Self::Configuration { message } => format!("Configuration problem: {}", message),
            Self::StoreConnection { message, .. } => {
                format!("Could not reach the object store: {}", message)
            }
            Self::DestinationConnection { message, .. } => {
                format!("Could not reach the destination API: {}", message)
            }
            Self::InvalidState { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
