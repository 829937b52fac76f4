use std::time::Duration;
use thiserror::Error;

/// Errors produced by a single conversion attempt
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The source already carries a text layer and the engine refused to redo it
    #[error("Page already has text: {0}")]
    PriorOcrFound(String),

    /// The engine ran and reported a failure
    #[error("{message}")]
    EngineFailed {
        /// Process exit code, `None` when the engine was terminated by a signal
        code: Option<i32>,
        /// Diagnostic text reported by the engine
        message: String,
    },

    /// The engine binary could not be started
    #[error("Conversion engine not available: {0}")]
    EngineNotAvailable(String),

    /// Options the engine would reject
    #[error("Invalid conversion options: {0}")]
    InvalidOptions(String),

    #[error("Conversion timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Whether this is the signal that triggers the fallback attempt
    pub fn is_prior_ocr(&self) -> bool {
        matches!(self, ConversionError::PriorOcrFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_prior_ocr_display() {
        let error = ConversionError::PriorOcrFound("page 1".to_string());
        assert_eq!(error.to_string(), "Page already has text: page 1");
        assert!(error.is_prior_ocr());
    }

    #[test]
    fn test_engine_failed_display_is_bare_message() {
        let error = ConversionError::EngineFailed {
            code: Some(8),
            message: "Input PDF is encrypted".to_string(),
        };
        assert_eq!(error.to_string(), "Input PDF is encrypted");
        assert!(!error.is_prior_ocr());
    }

    #[test]
    fn test_timeout_display() {
        let error = ConversionError::Timeout(Duration::from_secs(30));
        assert_eq!(error.to_string(), "Conversion timed out after 30s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::PermissionDenied, "denied");
        let error: ConversionError = io_error.into();
        assert!(matches!(error, ConversionError::Io(_)));
        assert_eq!(error.to_string(), "IO error: denied");
    }
}
