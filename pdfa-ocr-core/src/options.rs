//! Conversion settings for a single engine run
//!
//! A request goes through at most two runs: the primary attempt, which forces a
//! fresh OCR pass with image cleanup, and the fallback attempt, which keeps an
//! existing text layer and only normalizes the document to PDF/A.
//!
//! ```rust
//! use pdfa_ocr::{ConversionOptions, OutputType};
//!
//! let primary = ConversionOptions::primary();
//! assert!(primary.force_ocr && primary.deskew && primary.clean);
//!
//! let fallback = ConversionOptions::fallback().with_language("deu");
//! assert!(fallback.skip_text && !fallback.force_ocr);
//! assert_eq!(fallback.output_type, OutputType::Pdfa);
//! ```

use crate::error::{ConversionError, Result};
use std::fmt;

/// Highest optimization level the engine accepts
pub const MAX_OPTIMIZE_LEVEL: u8 = 3;

/// Output document flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// PDF/A at the engine's default part (PDF/A-2b)
    #[default]
    Pdfa,
    /// PDF/A-1b
    Pdfa1,
    /// PDF/A-2b
    Pdfa2,
    /// PDF/A-3b
    Pdfa3,
    /// Plain PDF, no archival normalization
    Pdf,
}

impl OutputType {
    /// Value passed to the engine's `--output-type` flag
    pub fn as_arg(&self) -> &'static str {
        match self {
            OutputType::Pdfa => "pdfa",
            OutputType::Pdfa1 => "pdfa-1",
            OutputType::Pdfa2 => "pdfa-2",
            OutputType::Pdfa3 => "pdfa-3",
            OutputType::Pdf => "pdf",
        }
    }

    pub fn is_archival(&self) -> bool {
        !matches!(self, OutputType::Pdf)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Settings for one conversion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Output document flavour
    pub output_type: OutputType,

    /// Rasterize and OCR every page even if it already has text
    pub force_ocr: bool,

    /// Leave pages that already have text untouched
    pub skip_text: bool,

    /// Straighten skewed page images
    pub deskew: bool,

    /// Clean page images before OCR
    pub clean: bool,

    /// Optimization level (0 to 3), engine default when unset
    pub optimize: Option<u8>,

    /// OCR language, engine default when unset
    pub language: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_type: OutputType::Pdfa,
            force_ocr: false,
            skip_text: false,
            deskew: false,
            clean: false,
            optimize: None,
            language: None,
        }
    }
}

impl ConversionOptions {
    /// First attempt: re-OCR everything, deskew and clean
    pub fn primary() -> Self {
        Self {
            force_ocr: true,
            skip_text: false,
            deskew: true,
            clean: true,
            ..Self::default()
        }
    }

    /// Second attempt after the prior-OCR signal: trust the existing text layer
    pub fn fallback() -> Self {
        Self {
            force_ocr: false,
            skip_text: true,
            optimize: Some(1),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Reject combinations the engine refuses before spawning it
    pub fn validate(&self) -> Result<()> {
        if self.force_ocr && self.skip_text {
            return Err(ConversionError::InvalidOptions(
                "force_ocr and skip_text are mutually exclusive".to_string(),
            ));
        }

        if let Some(level) = self.optimize {
            if level > MAX_OPTIMIZE_LEVEL {
                return Err(ConversionError::InvalidOptions(format!(
                    "optimize level {level} is out of range 0-{MAX_OPTIMIZE_LEVEL}"
                )));
            }
        }

        if let Some(language) = &self.language {
            if language.trim().is_empty() {
                return Err(ConversionError::InvalidOptions(
                    "language must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Command-line flags for the engine, in a stable order
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--output-type".to_string(),
            self.output_type.as_arg().to_string(),
        ];

        if self.force_ocr {
            args.push("--force-ocr".to_string());
        }
        if self.skip_text {
            args.push("--skip-text".to_string());
        }
        if self.deskew {
            args.push("--deskew".to_string());
        }
        if self.clean {
            args.push("--clean".to_string());
        }
        if let Some(level) = self.optimize {
            args.push("--optimize".to_string());
            args.push(level.to_string());
        }
        if let Some(language) = &self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }

        args
    }
}
