use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Export format '{format}' is not supported")]
    UnsupportedExport { format: String },

    #[error("No membership record found for {email}")]
    UnknownRecord { email: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 依嚴重程度決定的程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::TomlError(_)
            | EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_) | EtlError::ValidationError { .. } => ErrorCategory::Input,
            EtlError::UnknownRecord { .. } => ErrorCategory::Processing,
            EtlError::ZipError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_)
            | EtlError::UnsupportedExport { .. } => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::UnknownRecord { .. }
            | EtlError::UnsupportedExport { .. }
            | EtlError::ValidationError { .. } => ErrorSeverity::Medium,
            EtlError::CsvError(_)
            | EtlError::TomlError(_)
            | EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::High,
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::CsvError(_) => {
                "Check that the report is a comma-separated export with a header row".to_string()
            }
            EtlError::IoError(_) => {
                "Check that the input files exist and the output directory is writable".to_string()
            }
            EtlError::TomlError(_) | EtlError::ConfigError { .. } => {
                "Review the configuration file syntax and section names".to_string()
            }
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' and try again", field)
            }
            EtlError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            EtlError::UnsupportedExport { .. } => {
                "Use one of the supported export formats: csv, excel, json".to_string()
            }
            EtlError::UnknownRecord { .. } => {
                "Only customers present in the processed expirations report can be annotated"
                    .to_string()
            }
            EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                "Retry the export; if it keeps failing, export a single format without bundling"
                    .to_string()
            }
            EtlError::ValidationError { .. } => {
                "Check that the file is an unmodified Momence report export".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the membership reports: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::Output => format!("Could not write the results: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
