use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("The asset with ID {asset_id} has no linked raw assets!")]
    NoRawAsset { asset_id: i64 },

    #[error("The asset with ID {asset_id} has multiple linked raw assets!")]
    MultipleRawAssets { asset_id: i64 },

    #[error("Geocoding failed: {message}")]
    GeocodingError { message: String },

    #[error("Carto request failed: {message}")]
    CartoError { message: String },

    #[error("Query of {length} bytes exceeds the {limit} byte limit")]
    QueryTooLong { length: usize, limit: usize },

    #[error("Uploaded file of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Storage,
    Data,
    Integrity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl RegistryError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::GeocodingError { .. } | Self::CartoError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Storage,
            Self::NoRawAsset { .. } | Self::MultipleRawAssets { .. } | Self::Conflict { .. } => {
                ErrorCategory::Integrity
            }
            Self::CsvError(_)
            | Self::NotFound { .. }
            | Self::ValidationError { .. }
            | Self::QueryTooLong { .. }
            | Self::FileTooLarge { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Integrity => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ApiError(_) | Self::GeocodingError { .. } => {
                "Check network connectivity and the geocoder API key, then retry".to_string()
            }
            Self::CartoError { .. } => "Check the Carto base URL and API key".to_string(),
            Self::CsvError(_) => "Make sure the file is UTF-8 CSV with a header row".to_string(),
            Self::IoError(_) => "Check that the data directory exists and is writable".to_string(),
            Self::SerializationError(_) => {
                "The registry snapshot may be corrupt; restore it from a backup".to_string()
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Review the configuration file and environment variables".to_string()
            }
            Self::NotFound { entity, .. } => format!("Verify that the {entity} ID is correct"),
            Self::NoRawAsset { asset_id } | Self::MultipleRawAssets { asset_id } => format!(
                "Fix the raw asset links of asset {asset_id} by hand before running the repair again"
            ),
            Self::QueryTooLong { .. } => "Send fewer assets per statement".to_string(),
            Self::FileTooLarge { .. } => "Split the file into smaller uploads".to_string(),
            Self::ValidationError { .. } | Self::Conflict { .. } => {
                "Correct the input data and retry".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("External service problem: {self}"),
            ErrorCategory::Configuration => format!("Configuration problem: {self}"),
            ErrorCategory::Storage => format!("Storage problem: {self}"),
            ErrorCategory::Data => format!("Input problem: {self}"),
            ErrorCategory::Integrity => format!("Data integrity problem: {self}"),
        }
    }

    /// Logs the error with its recovery hint.
    pub fn report(&self, context: &str) {
        tracing::error!(
            "❌ {}: {} (Category: {:?}, Severity: {:?})",
            context,
            self.user_friendly_message(),
            self.category(),
            self.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", self.recovery_suggestion());
    }

    /// Process exit code for the command line tools.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
