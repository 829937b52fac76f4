//! Primary attempt with a single prior-OCR fallback

use crate::converter::PdfaConverter;
use crate::error::ConversionError;
use crate::options::ConversionOptions;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Which attempt produced the result or the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Fallback,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attempt::Primary => f.write_str("primary"),
            Attempt::Fallback => f.write_str("fallback"),
        }
    }
}

/// A conversion that could not be completed by either attempt
#[derive(Error, Debug)]
pub enum ConversionFailure {
    #[error("Error processing PDF: {0}")]
    Primary(#[source] ConversionError),

    #[error("OCR conversion error: {0}")]
    Fallback(#[source] ConversionError),
}

impl ConversionFailure {
    pub fn attempt(&self) -> Attempt {
        match self {
            ConversionFailure::Primary(_) => Attempt::Primary,
            ConversionFailure::Fallback(_) => Attempt::Fallback,
        }
    }

    /// The engine error behind this failure
    pub fn cause(&self) -> &ConversionError {
        match self {
            ConversionFailure::Primary(e) | ConversionFailure::Fallback(e) => e,
        }
    }
}

/// Run `primary`, and `fallback` only if `primary` reports prior OCR
///
/// Returns the attempt whose output is now at `output`. Any failure other
/// than the prior-OCR signal ends the conversion without a second attempt.
pub async fn convert_to_pdfa(
    converter: &dyn PdfaConverter,
    input: &Path,
    output: &Path,
    primary: &ConversionOptions,
    fallback: &ConversionOptions,
) -> Result<Attempt, ConversionFailure> {
    match converter.convert(input, output, primary).await {
        Ok(()) => Ok(Attempt::Primary),
        Err(ConversionError::PriorOcrFound(reason)) => {
            info!(
                engine = converter.engine_name(),
                reason = %reason,
                "Input already has OCR text, retrying without forced OCR"
            );
            converter
                .convert(input, output, fallback)
                .await
                .map(|()| Attempt::Fallback)
                .map_err(|e| {
                    warn!(
                        engine = converter.engine_name(),
                        error = %e,
                        "Fallback conversion failed"
                    );
                    ConversionFailure::Fallback(e)
                })
        }
        Err(e) => {
            warn!(engine = converter.engine_name(), error = %e, "Primary conversion failed");
            Err(ConversionFailure::Primary(e))
        }
    }
}
