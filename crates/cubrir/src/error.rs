//! Result and error types for Cubrir.

use crate::run::ConfigError;
use crate::spec::SpecParseError;
use thiserror::Error;

/// Result type for Cubrir operations
pub type CubrirResult<T> = Result<T, CubrirError>;

/// Errors that can occur in Cubrir
#[derive(Debug, Error)]
pub enum CubrirError {
    /// Specification could not be parsed or resolved
    #[error("Spec error: {0}")]
    Spec(#[from] SpecParseError),

    /// Run configuration was rejected before the run started
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Executor-level failure (worker panic, delegate runner unusable)
    #[error("Executor error: {message}")]
    Executor {
        /// Error message
        message: String,
    },

    /// Result sink failure
    #[error("Sink error: {message}")]
    Sink {
        /// Error message
        message: String,
    },

    /// Spec document could not be fetched from a URL
    #[error("Failed to fetch spec: {0}")]
    SpecFetch(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CubrirError {
    /// Create an executor error
    #[must_use]
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor {
            message: message.into(),
        }
    }

    /// Create a sink error
    #[must_use]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_error_display() {
        let err = CubrirError::executor("worker died");
        assert!(err.to_string().contains("Executor"));
        assert!(err.to_string().contains("worker died"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CubrirError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }

    #[test]
    fn test_spec_error_from() {
        let err: CubrirError = SpecParseError::unsupported_version("1.1").into();
        assert!(err.to_string().contains("1.1"));
    }
}
