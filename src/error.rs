//! Error types for the bandicoot library.

use thiserror::Error;

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while building or running a simulation.
///
/// Out-of-range preference indices are deliberately *not* represented here:
/// the preference store treats them as no-ops.
#[derive(Error, Debug)]
pub enum SimError {
    /// A component was used before its required parameters were set.
    #[error("not configured: {message}")]
    NotConfigured { message: String },

    /// A component was configured with parameters it cannot work with.
    #[error("bad configuration: {message}")]
    BadConfigured { message: String },

    /// Invalid parameter value.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// A cluster division did not cover the original cluster exactly.
    #[error("invalid partition: {message}")]
    InvalidPartition { message: String },

    /// No factory is registered under the requested algorithm name.
    #[error("unknown algorithm: {name}")]
    UnknownAlgorithm { name: String },

    /// Underlying I/O failure (log writing, dataset reading).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure while reading or writing delimited text.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed configuration document.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::NotConfigured {
            message: "edge probability missing".to_string(),
        };
        assert_eq!(err.to_string(), "not configured: edge probability missing");

        let err = SimError::invalid("alpha must be positive");
        assert_eq!(err.to_string(), "invalid parameter: alpha must be positive");

        let err = SimError::UnknownAlgorithm {
            name: "linucb".to_string(),
        };
        assert_eq!(err.to_string(), "unknown algorithm: linucb");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SimError = io.into();
        assert!(matches!(err, SimError::Io(_)));
    }
}
