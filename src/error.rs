//! Error Handling Module
//!
//! Provides structured error types for the fuel market ETL pipeline.
//! Uses `thiserror` for ergonomic error definitions and maps every
//! variant to a process exit code for the `fuel-etl` binary.
//!
//! Missing values, corrected data-quality violations and inner-join
//! coverage gaps are handled in the data itself and never surface here.
//! Only conditions that would corrupt the fact table become an `EtlError`.

use thiserror::Error;

use crate::types::Source;

// ============================================================================
// Exit Codes
// ============================================================================

pub const EXIT_UPSTREAM_UNAVAILABLE: u8 = 2;
pub const EXIT_INVALID_INPUT: u8 = 3;
pub const EXIT_CONTRACT_VIOLATION: u8 = 4;
pub const EXIT_CONFIG: u8 = 5;
pub const EXIT_LOAD_FAILED: u8 = 6;
pub const EXIT_INTERNAL: u8 = 70;

// ============================================================================
// Error Types
// ============================================================================

/// Main error type for the ETL pipeline.
#[derive(Error, Debug, Clone)]
pub enum EtlError {
    // Input Errors
    #[error("Upstream source '{origin}' unavailable: {reason}")]
    UpstreamUnavailable { origin: Source, reason: String },

    #[error("Source '{origin}' is missing required column: {column}")]
    MissingColumn { origin: Source, column: String },

    #[error("Post-condition violated: {0}")]
    ContractViolation(String),

    // Parameter Errors
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Wrapped library errors
    #[error("Polars error: {0}")]
    Polars(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Create a Result type alias for convenience.
pub type EtlResult<T> = Result<T, EtlError>;

// ============================================================================
// Exit Code Conversion
// ============================================================================

impl EtlError {
    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::UpstreamUnavailable { .. } | EtlError::Http(_) => EXIT_UPSTREAM_UNAVAILABLE,
            EtlError::MissingColumn { .. } => EXIT_INVALID_INPUT,
            EtlError::ContractViolation(_) => EXIT_CONTRACT_VIOLATION,
            EtlError::InvalidParameter { .. } | EtlError::Config(_) => EXIT_CONFIG,
            EtlError::Database(_) | EtlError::Io(_) => EXIT_LOAD_FAILED,
            EtlError::Polars(_) => EXIT_INTERNAL,
        }
    }

    /// Whether the error means an input relation could not be obtained at all.
    pub fn is_upstream(&self) -> bool {
        matches!(self, EtlError::UpstreamUnavailable { .. })
    }
}

// ============================================================================
// Error Conversion Implementations
// ============================================================================

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        EtlError::Polars(err.to_string())
    }
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        EtlError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> Self {
        EtlError::Http(err.to_string())
    }
}

// ============================================================================
// Error Construction Helpers
// ============================================================================

impl EtlError {
    /// Create an upstream unavailable error.
    pub fn upstream(origin: Source, reason: impl Into<String>) -> Self {
        EtlError::UpstreamUnavailable {
            origin,
            reason: reason.into(),
        }
    }

    /// Create a missing column error.
    pub fn missing_column(origin: Source, column: impl Into<String>) -> Self {
        EtlError::MissingColumn {
            origin,
            column: column.into(),
        }
    }

    /// Create a post-condition violation.
    pub fn contract(message: impl Into<String>) -> Self {
        EtlError::ContractViolation(message.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::Config(message.into())
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        EtlError::Database(message.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
