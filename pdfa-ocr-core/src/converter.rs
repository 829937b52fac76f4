//! Pluggable conversion engines
//!
//! Every engine turns an input PDF on disk into an OCR'd output PDF on disk.
//! The HTTP layer only talks to [`PdfaConverter`], so tests swap the real
//! `ocrmypdf` process for [`MockConverter`](crate::MockConverter).

use crate::error::Result;
use crate::options::ConversionOptions;
use async_trait::async_trait;
use std::path::Path;

/// An engine that OCRs a PDF and writes the archival result
///
/// # Errors
///
/// Implementations return [`ConversionError::PriorOcrFound`] when the input
/// already has a text layer that the requested options refuse to overwrite.
/// Callers rely on that variant to decide whether a fallback attempt is worth
/// making, so it must not be folded into a generic failure.
///
/// [`ConversionError::PriorOcrFound`]: crate::ConversionError::PriorOcrFound
#[async_trait]
pub trait PdfaConverter: Send + Sync {
    /// Convert `input` into `output` using `options`
    ///
    /// On success `output` exists and holds the complete document. The input
    /// file is never modified or removed.
    async fn convert(&self, input: &Path, output: &Path, options: &ConversionOptions)
        -> Result<()>;

    /// Short human readable name of the engine
    fn engine_name(&self) -> &str;
}
