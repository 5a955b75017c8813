//! Error types for the code-covered library.
//!
//! Errors fall on two sides of one boundary: report-level problems
//! ([`CoveredError::MalformedReport`], configuration failures) abort a run, while
//! per-file problems ([`CoveredError::Parse`], [`CoveredError::MissingFile`],
//! [`CoveredError::Io`]) are turned into warnings by the engine and never stop the
//! remaining files from being analyzed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main result type for code-covered operations.
pub type Result<T> = std::result::Result<T, CoveredError>;

/// Error type for all code-covered operations.
#[derive(Error, Debug)]
pub enum CoveredError {
    /// I/O related errors (reading sources, reports, configuration)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Source text could not be parsed
    #[error("Parse error in {language}: {message}")]
    Parse {
        /// Programming language being parsed
        language: String,
        /// Error description
        message: String,
        /// File path where error occurred
        file_path: Option<String>,
        /// Line number (if available)
        line: Option<usize>,
        /// Column number (if available)
        column: Option<usize>,
    },

    /// The report references a source file that is not on disk
    #[error("Source file not found: {}", path.display())]
    MissingFile {
        /// Path the resolver produced for the report entry
        path: PathBuf,
    },

    /// The coverage report lacks required structure
    #[error("Malformed coverage report: {message}")]
    MalformedReport {
        /// Error description
        message: String,
        /// Report location (file key or field) that failed
        field: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoveredError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new parse error
    pub fn parse(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: None,
            line: None,
            column: None,
        }
    }

    /// Create a new parse error with file context
    pub fn parse_with_location(
        language: impl Into<String>,
        message: impl Into<String>,
        file_path: impl Into<String>,
        line: Option<usize>,
        column: Option<usize>,
    ) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: Some(file_path.into()),
            line,
            column,
        }
    }

    /// Create a new missing-file error
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// Create a new malformed-report error
    pub fn malformed_report(message: impl Into<String>) -> Self {
        Self::MalformedReport {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new malformed-report error pointing at a report location
    pub fn malformed_report_at(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MalformedReport {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Whether this error only affects a single source file.
    ///
    /// The engine degrades these into warnings; everything else is fatal.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::MissingFile { .. } | Self::Io { .. }
        )
    }
}

impl From<serde_json::Error> for CoveredError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for CoveredError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}
