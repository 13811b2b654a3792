use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

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

    #[error("Malformed reference entry #{index}: missing {field}")]
    MalformedReferenceEntry { index: usize, field: String },

    #[error("Extraction failed for '{id}': {message}")]
    ExtractionError {
        id: String,
        message: String,
        retryable: bool,
    },

    #[error("Validation error in '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Reference,
    Extraction,
    Validation,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 重試錯誤
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::SerializationError(_) | EtlError::CsvError(_) => ErrorCategory::Data,
            EtlError::TaskError(_) | EtlError::ProcessingError { .. } => ErrorCategory::Runtime,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::MalformedReferenceEntry { .. } => ErrorCategory::Reference,
            EtlError::ExtractionError { .. } => ErrorCategory::Extraction,
            EtlError::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ValidationError { .. } => ErrorSeverity::Low,
            EtlError::ExtractionError { retryable, .. } => {
                if *retryable {
                    ErrorSeverity::Medium
                } else {
                    ErrorSeverity::High
                }
            }
            EtlError::SerializationError(_)
            | EtlError::CsvError(_)
            | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::IoError(_)
            | EtlError::TaskError(_)
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::MalformedReferenceEntry { .. } => ErrorSeverity::Critical,
        }
    }

    /// 只有外部抽取呼叫的暫時性失敗值得重試
    pub fn is_retryable(&self) -> bool {
        matches!(self, EtlError::ExtractionError { retryable: true, .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the input files exist and the output path is writable",
            ErrorCategory::Data => "Check that the input files contain valid JSON",
            ErrorCategory::Configuration => "Review the command line flags or the TOML configuration file",
            ErrorCategory::Reference => {
                "Every port reference entry needs a non-empty `code` and `name`"
            }
            ErrorCategory::Extraction => {
                "Re-run the extraction step for the affected emails or check the recorded output"
            }
            ErrorCategory::Validation => "The affected record was replaced by a fallback record",
            ErrorCategory::Runtime => "Re-run with --verbose and inspect the logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::IoError(e) => format!("Could not read or write a file: {}", e),
            EtlError::SerializationError(e) => format!("Input is not valid JSON: {}", e),
            EtlError::MalformedReferenceEntry { index, field } => format!(
                "Port reference dataset is broken: entry #{} has no {}",
                index, field
            ),
            EtlError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_extraction_errors() {
        let transient = EtlError::ExtractionError {
            id: "EMAIL_001".to_string(),
            message: "rate limited".to_string(),
            retryable: true,
        };
        let permanent = EtlError::ExtractionError {
            id: "EMAIL_001".to_string(),
            message: "no recorded output".to_string(),
            retryable: false,
        };

        assert!(transient.is_retryable());
        assert_eq!(transient.severity(), ErrorSeverity::Medium);
        assert!(!permanent.is_retryable());
        assert_eq!(permanent.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_reference_errors_are_critical() {
        let err = EtlError::MalformedReferenceEntry {
            index: 3,
            field: "code".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Reference);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("#3"));
        assert_eq!(err.severity().exit_code(), 3);
    }
}
