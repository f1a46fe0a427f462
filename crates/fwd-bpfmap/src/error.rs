//! Error types for pinned map operations.
//!
//! Errors fall in four groups: rejected table definitions (`Config`),
//! caller-supplied keys or values of the wrong length (`SizeMismatch`),
//! failures to run the helper (`Spawn`, `Execution`, `Cancelled`,
//! `TimedOut`) and the helper's own `{"error": ...}` payload (`Store`).

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for map operations.
pub type MapResult<T> = Result<T, MapError>;

/// Errors that can occur while managing a pinned map.
#[derive(Debug, Error)]
pub enum MapError {
    /// Invalid shape/size/flag combination or table name.
    #[error("Invalid table definition for {field}: {message}")]
    Config {
        /// The parameter that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Key or value length disagrees with the table's declared sizes.
    #[error("{what} length is {actual}, table expects {expected}")]
    SizeMismatch {
        /// "key" or "value".
        what: &'static str,
        /// Declared size in bytes.
        expected: usize,
        /// Supplied size in bytes.
        actual: usize,
    },

    /// The helper process could not be started.
    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        /// The rendered command line.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The helper exited abnormally or produced undecodable output.
    #[error("Command '{command}' failed: {message}")]
    Execution {
        /// The rendered command line.
        command: String,
        /// Error message.
        message: String,
    },

    /// The caller cancelled the operation while the helper was running.
    #[error("Command '{command}' cancelled")]
    Cancelled {
        /// The rendered command line.
        command: String,
    },

    /// The caller's deadline expired while the helper was running.
    #[error("Command '{command}' timed out after {timeout:?}")]
    TimedOut {
        /// The rendered command line.
        command: String,
        /// The deadline that fired.
        timeout: Duration,
    },

    /// Structured error reported by the helper, message kept verbatim.
    #[error("{message}")]
    Store {
        /// The rendered command line.
        command: String,
        /// The helper's error string.
        message: String,
    },
}

impl MapError {
    /// Creates a table definition error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an execution error.
    pub fn execution(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a store error from the helper's payload.
    pub fn store(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Checks a buffer length against the declared size.
    pub fn check_size(what: &'static str, expected: usize, actual: usize) -> MapResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::SizeMismatch {
                what,
                expected,
                actual,
            })
        }
    }

    /// Returns true if the helper never got to run to completion, so
    /// repeating the call may succeed. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MapError::Cancelled { .. } | MapError::TimedOut { .. })
    }

    /// Returns true for failures to run the helper, as opposed to
    /// validation errors or the helper's own error payload.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            MapError::Spawn { .. }
                | MapError::Execution { .. }
                | MapError::Cancelled { .. }
                | MapError::TimedOut { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_verbatim() {
        let err = MapError::store(
            "bpftool -j map dump pinned /sys/fs/bpf/hfwd",
            "bpf obj get (/sys/fs/bpf/hfwd): No such file or directory",
        );
        assert_eq!(
            err.to_string(),
            "bpf obj get (/sys/fs/bpf/hfwd): No such file or directory"
        );
    }

    #[test]
    fn test_size_mismatch() {
        assert!(MapError::check_size("key", 4, 4).is_ok());
        let err = MapError::check_size("value", 16, 15).unwrap_err();
        assert_eq!(err.to_string(), "value length is 15, table expects 16");
    }

    #[test]
    fn test_config_error_display() {
        let err = MapError::config("key_size", "array tables need a 4 byte key");
        assert_eq!(
            err.to_string(),
            "Invalid table definition for key_size: array tables need a 4 byte key"
        );
    }

    #[test]
    fn test_classification() {
        let cancelled = MapError::Cancelled {
            command: "bpftool -j map show".to_string(),
        };
        assert!(cancelled.is_retryable());
        assert!(cancelled.is_execution());

        let store = MapError::store("bpftool", "File exists");
        assert!(!store.is_retryable());
        assert!(!store.is_execution());

        assert!(MapError::execution("bpftool", "exit status 255").is_execution());
        assert!(!MapError::config("name", "empty").is_execution());
    }
}
