//! Error types for ap-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for ap-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// One object that failed during a bulk transfer
#[derive(Debug)]
pub struct TransferFailure {
    /// Address of the object that was being moved
    pub source: String,
    /// What went wrong
    pub error: Error,
}

impl std::fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Error types for ap-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or server failure while moving data
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Source and destination disagree on file/directory nature
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Some objects of a bulk transfer failed
    #[error(
        "{} of {} transfers failed (first: {})",
        .failures.len(),
        attempted(.succeeded, .failures),
        first_failure(.failures)
    )]
    PartialTransfer {
        /// Number of objects moved successfully
        succeeded: usize,
        /// Every object that failed
        failures: Vec<TransferFailure>,
    },

    /// Feature not supported, e.g. no backend registered for a storage kind
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// General error
    #[error("{0}")]
    General(String),
}

fn attempted(succeeded: &usize, failures: &[TransferFailure]) -> usize {
    *succeeded + failures.len()
}

fn first_failure(failures: &[TransferFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,        // UsageError
            Error::Config(_) => 2,             // UsageError
            Error::TomlParse(_) => 2,          // UsageError
            Error::Transfer(_) => 3,           // TransferError
            Error::PartialTransfer { .. } => 3, // TransferError
            Error::Auth(_) => 4,               // AuthError
            Error::NotFound(_) => 5,           // NotFound
            Error::ContractViolation(_) => 6,  // ContractViolation
            Error::UnsupportedFeature(_) => 7, // UnsupportedFeature
            _ => 1,                            // GeneralError
        }
    }

    /// Whether this error means the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
