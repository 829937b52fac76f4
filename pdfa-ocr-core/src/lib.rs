//! # pdfa-ocr
//!
//! Turn scanned or born-digital PDFs into searchable PDF/A documents by driving
//! an external OCR engine.
//!
//! ## Features
//!
//! - **Engine abstraction**: [`PdfaConverter`] trait with an `ocrmypdf` backed
//!   implementation and an in-process mock
//! - **Attempt presets**: [`ConversionOptions::primary`] forces a fresh OCR
//!   pass with deskew and cleanup, [`ConversionOptions::fallback`] keeps an
//!   existing text layer
//! - **Fallback policy**: [`convert_to_pdfa`] retries once, and only when the
//!   engine reports that the document already has OCR text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfa_ocr::{convert_to_pdfa, ConversionOptions, OcrmypdfConverter};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = OcrmypdfConverter::new();
//! let attempt = convert_to_pdfa(
//!     &converter,
//!     Path::new("scan.pdf"),
//!     Path::new("scan_pdfa.pdf"),
//!     &ConversionOptions::primary(),
//!     &ConversionOptions::fallback(),
//! )
//! .await?;
//! println!("converted by the {attempt} attempt");
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod error;
pub mod mock;
pub mod ocrmypdf;
pub mod options;
pub mod policy;

pub use converter::PdfaConverter;
pub use error::{ConversionError, Result};
pub use mock::{MockCall, MockConverter, MockMode};
pub use ocrmypdf::{OcrmypdfConfig, OcrmypdfConverter, OcrmypdfExitCode};
pub use options::{ConversionOptions, OutputType, MAX_OPTIMIZE_LEVEL};
pub use policy::{convert_to_pdfa, Attempt, ConversionFailure};
