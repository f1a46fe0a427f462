//! Error types for fwdd

use fwd_bpfmap::MapError;
use fwd_types::ParseError;
use thiserror::Error;

/// Forwarding daemon errors
#[derive(Error, Debug)]
pub enum FwdError {
    /// Malformed IP or MAC input, rejected before any table call
    #[error("Format error: {0}")]
    Format(#[from] ParseError),

    /// Table operation failed
    #[error("Table error: {0}")]
    Table(#[from] MapError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FwdError {
    /// Returns true if the failed table call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FwdError::Table(e) if e.is_retryable())
    }

    /// Returns true for input the caller has to fix.
    pub fn is_format(&self) -> bool {
        matches!(self, FwdError::Format(_))
    }
}

/// Result type for fwdd operations
pub type Result<T> = std::result::Result<T, FwdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FwdError::from(ParseError::InvalidIpAddress("not-an-ip".to_string()));
        assert_eq!(
            err.to_string(),
            "Format error: invalid IP address format: not-an-ip"
        );
        assert!(err.is_format());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_table_error_passthrough() {
        let err = FwdError::from(MapError::store("dump", "No such file or directory"));
        assert_eq!(err.to_string(), "Table error: No such file or directory");

        let err = FwdError::from(MapError::Cancelled {
            command: "bpftool -j map show".to_string(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_config_error() {
        let err = FwdError::Config("http.port must be 1..65534".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: http.port must be 1..65534"
        );
    }
}
