//! Top-level error types for the packager binary.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Main error type surfaced by the CLI
#[derive(Error, Debug)]
pub enum PackagerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Builder errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundler_errors_keep_their_message() {
        let err: PackagerError = crate::bundler::Error::UnsupportedDistro {
            distro: "fedora".into(),
            package: None,
        }
        .into();
        assert_eq!(err.to_string(), "unsupported distro 'fedora'");
    }

    #[test]
    fn test_cli_error_display() {
        let err: PackagerError = CliError::InvalidArguments {
            reason: "proto area missing".into(),
        }
        .into();
        assert_eq!(err.to_string(), "CLI error: Invalid arguments: proto area missing");
    }
}
