//! CLI-specific error types
//!
//! All CLI errors are fatal: the process prints the error and exits non-zero.
//! Per-document validation failures are not CLI errors; they are written to
//! stdout as responses.

use std::fmt;
use std::io;

use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Schema directory or file could not be loaded
    SchemaLoadError,
    /// Requested schema is not registered
    UnknownSchema,
    /// Input line is not valid JSON
    ParseError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "MODELGUARD_CONFIG_ERROR",
            Self::IoError => "MODELGUARD_IO_ERROR",
            Self::SchemaLoadError => "MODELGUARD_SCHEMA_LOAD_ERROR",
            Self::UnknownSchema => "MODELGUARD_UNKNOWN_SCHEMA",
            Self::ParseError => "MODELGUARD_PARSE_ERROR",
        }
    }
}

impl fmt::Display for CliErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ParseError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_error(err.to_string())
    }
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        let code = match err {
            SchemaError::Unknown(_) => CliErrorCode::UnknownSchema,
            _ => CliErrorCode::SchemaLoadError,
        };
        Self::new(code, err.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
