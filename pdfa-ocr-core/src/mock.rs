//! In-process converter for tests and engine-less development

use crate::converter::PdfaConverter;
use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// How [`MockConverter`] answers each attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockMode {
    /// Every attempt succeeds
    Succeed,
    /// Attempts with `force_ocr` report prior OCR, all others succeed
    PriorOcr,
    /// Attempts with `force_ocr` report prior OCR, all others fail
    PriorOcrThenFail(String),
    /// Every attempt fails with the given message
    Fail(String),
}

/// One recorded call to [`MockConverter::convert`]
#[derive(Debug, Clone)]
pub struct MockCall {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: ConversionOptions,
}

/// Converter that copies the input to the output instead of running OCR
///
/// # Examples
///
/// ```rust
/// use pdfa_ocr::{ConversionOptions, MockConverter, MockMode, PdfaConverter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let input = dir.path().join("in.pdf");
/// let output = dir.path().join("out.pdf");
/// std::fs::write(&input, b"%PDF-1.4")?;
///
/// let converter = MockConverter::new(MockMode::PriorOcr);
/// let err = converter
///     .convert(&input, &output, &ConversionOptions::primary())
///     .await
///     .unwrap_err();
/// assert!(err.is_prior_ocr());
///
/// converter
///     .convert(&input, &output, &ConversionOptions::fallback())
///     .await?;
/// assert_eq!(std::fs::read(&output)?, b"%PDF-1.4");
/// assert_eq!(converter.calls().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockConverter {
    mode: MockMode,
    delay: Option<Duration>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockConverter {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every attempt, to keep requests in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn mode(&self) -> &MockMode {
        &self.mode
    }

    /// Snapshot of every call made so far, in call order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, input: &Path, output: &Path, options: &ConversionOptions) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                options: options.clone(),
            });
        }
    }
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new(MockMode::Succeed)
    }
}

#[async_trait]
impl PdfaConverter for MockConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        self.record(input, output, options);
        options.validate()?;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match (&self.mode, options.force_ocr) {
            (MockMode::PriorOcr, true) | (MockMode::PriorOcrThenFail(_), true) => {
                return Err(ConversionError::PriorOcrFound(
                    "page already has text! - aborting".to_string(),
                ));
            }
            (MockMode::PriorOcrThenFail(message), false) | (MockMode::Fail(message), _) => {
                return Err(ConversionError::EngineFailed {
                    code: Some(15),
                    message: message.clone(),
                });
            }
            _ => {}
        }

        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_input(dir: &Path) -> (PathBuf, PathBuf) {
        let input = dir.join("input.pdf");
        std::fs::write(&input, b"%PDF-1.7 mock").unwrap();
        (input, dir.join("output.pdf"))
    }

    #[tokio::test]
    async fn test_succeed_copies_input() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = write_input(dir.path());
        let converter = MockConverter::default();

        converter
            .convert(&input, &output, &ConversionOptions::primary())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.7 mock");
        let calls = converter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, input);
        assert_eq!(calls[0].options, ConversionOptions::primary());
    }

    #[tokio::test]
    async fn test_fail_mode_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = write_input(dir.path());
        let converter = MockConverter::new(MockMode::Fail("broken".to_string()));

        let err = converter
            .convert(&input, &output, &ConversionOptions::fallback())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "broken");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_prior_ocr_then_fail() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = write_input(dir.path());
        let converter = MockConverter::new(MockMode::PriorOcrThenFail("no luck".to_string()));

        let first = converter
            .convert(&input, &output, &ConversionOptions::primary())
            .await
            .unwrap_err();
        assert!(first.is_prior_ocr());

        let second = converter
            .convert(&input, &output, &ConversionOptions::fallback())
            .await
            .unwrap_err();
        assert!(!second.is_prior_ocr());
        assert_eq!(converter.calls().len(), 2);
    }

    #[test]
    fn test_engine_name() {
        assert_eq!(MockConverter::default().engine_name(), "mock");
        assert_eq!(MockConverter::default().mode(), &MockMode::Succeed);
    }
}
