//! Error types for config-refresher.

use std::fmt;

/// Result type alias for config-refresher operations.
pub type Result<T> = std::result::Result<T, RefresherError>;

/// Errors that can occur while loading, watching, or reloading.
#[derive(Debug, thiserror::Error)]
pub enum RefresherError {
    /// A line of the source list could not be parsed.
    #[error("Invalid source list entry on line {line}: {reason}")]
    SourceList {
        /// 1-based line number of the offending entry
        line: usize,
        /// What is wrong with the entry
        reason: String,
    },

    /// The source list parsed successfully but contained no sources.
    #[error("Source list contained no sources")]
    EmptySourceList,

    /// Two entries of the source list share an identity.
    #[error("Duplicate source id '{id}' on line {line}")]
    DuplicateSource {
        /// The repeated identity
        id: String,
        /// 1-based line number of the second occurrence
        line: usize,
    },

    /// The source could not be reached or its body could not be read.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The source answered with a non-success status code.
    #[error("Fetch returned non-success status {status}")]
    FetchStatus {
        /// HTTP status code returned by the source
        status: u16,
    },

    /// The orchestration API rejected a list or patch call.
    #[error("Orchestration API error: {0}")]
    Orchestration(String),

    /// Settings could not be loaded or deserialized.
    #[error("Failed to load settings: {0}")]
    Settings(String),

    /// Settings validation failed.
    #[error("Settings validation failed: {0}")]
    ValidationError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Refresher error: {0}")]
    Other(String),
}

impl RefresherError {
    /// Whether this error only affects a single check cycle of one source.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::FetchStatus { .. })
    }
}

impl From<kube::Error> for RefresherError {
    fn from(err: kube::Error) -> Self {
        RefresherError::Orchestration(err.to_string())
    }
}

/// Validation error for settings validation.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for RefresherError {
    fn from(err: ValidationError) -> Self {
        RefresherError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_are_soft() {
        assert!(RefresherError::Fetch("connection refused".into()).is_soft());
        assert!(RefresherError::FetchStatus { status: 503 }.is_soft());
        assert!(!RefresherError::EmptySourceList.is_soft());
        assert!(!RefresherError::Orchestration("forbidden".into()).is_soft());
    }

    #[test]
    fn test_multiple_validation_errors_display() {
        let err = ValidationError::Multiple(vec![
            ValidationError::invalid_field("reload_key", "must not be empty"),
            ValidationError::custom("keys must differ"),
        ]);

        let text = err.to_string();
        assert!(text.contains("1. Field 'reload_key' is invalid: must not be empty"));
        assert!(text.contains("2. keys must differ"));
    }

    #[test]
    fn test_source_list_error_mentions_line() {
        let err = RefresherError::SourceList {
            line: 4,
            reason: "missing '='".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid source list entry on line 4: missing '='"
        );
    }
}
