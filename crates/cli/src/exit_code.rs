//! Exit code definitions for the anypath CLI
//!
//! Scripts branch on these values. Changing one is a breaking change.

use ap_core::Error;

/// Exit codes for the anypath CLI application.
///
/// Each error class gets its own code so automation can tell a missing
/// object from a refused credential without parsing stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error
    GeneralError = 1,

    /// User input error: invalid arguments, malformed address, bad config
    UsageError = 2,

    /// Moving data failed: network error, server error, partial bulk transfer
    TransferError = 3,

    /// Authentication or permission failure
    AuthError = 4,

    /// Source path, bucket or container does not exist
    NotFound = 5,

    /// Copy refused: source and destination disagree on file/directory nature,
    /// or the destination is the source itself
    ContractViolation = 6,

    /// No backend is available for the storage kind
    UnsupportedFeature = 7,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::TransferError),
            4 => Some(Self::AuthError),
            5 => Some(Self::NotFound),
            6 => Some(Self::ContractViolation),
            7 => Some(Self::UnsupportedFeature),
            _ => None,
        }
    }

    /// Exit code for a failed operation
    pub fn from_error(error: &Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }

    /// Get a human-readable description of the exit code
    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or path format",
            Self::TransferError => "Transfer failed",
            Self::AuthError => "Authentication or permission failure",
            Self::NotFound => "Resource not found",
            Self::ContractViolation => "Copy precondition not met",
            Self::UnsupportedFeature => "Storage backend not available",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::TransferError.as_i32(), 3);
        assert_eq!(ExitCode::AuthError.as_i32(), 4);
        assert_eq!(ExitCode::NotFound.as_i32(), 5);
        assert_eq!(ExitCode::ContractViolation.as_i32(), 6);
        assert_eq!(ExitCode::UnsupportedFeature.as_i32(), 7);
    }

    #[test]
    fn test_exit_code_from_i32() {
        assert_eq!(ExitCode::from_i32(0), Some(ExitCode::Success));
        assert_eq!(ExitCode::from_i32(3), Some(ExitCode::TransferError));
        assert_eq!(ExitCode::from_i32(6), Some(ExitCode::ContractViolation));
        assert_eq!(ExitCode::from_i32(7), Some(ExitCode::UnsupportedFeature));
        assert_eq!(ExitCode::from_i32(130), None);
        assert_eq!(ExitCode::from_i32(99), None);
    }

    #[test]
    fn test_exit_code_from_error() {
        assert_eq!(
            ExitCode::from_error(&Error::NotFound("s3://b/k".into())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::ContractViolation("file onto dir".into())),
            ExitCode::ContractViolation
        );
        assert_eq!(
            ExitCode::from_error(&Error::UnsupportedFeature("azure".into())),
            ExitCode::UnsupportedFeature
        );
        assert_eq!(
            ExitCode::from_error(&Error::General("boom".into())),
            ExitCode::GeneralError
        );
        assert_eq!(
            ExitCode::from_error(&Error::PartialTransfer {
                succeeded: 1,
                failures: Vec::new(),
            }),
            ExitCode::TransferError
        );
    }

    #[test]
    fn test_exit_code_display() {
        let display = format!("{}", ExitCode::Success);
        assert!(display.contains("0"));
        assert!(display.contains("successfully"));

        let display = format!("{}", ExitCode::NotFound);
        assert!(display.contains("5"));
        assert!(display.contains("not found"));
    }
}
