//! `ocrmypdf` engine driver
//!
//! Runs the `ocrmypdf` command-line tool as a child process. OCR, deskewing,
//! image cleanup and PDF/A normalization all happen inside that process and
//! the helpers it spawns; this module only builds the command line, waits for
//! the exit status and translates it.
//!
//! # Installation
//!
//! ## Ubuntu/Debian
//! ```bash
//! sudo apt-get install ocrmypdf unpaper
//! ```
//!
//! ## macOS
//! ```bash
//! brew install ocrmypdf unpaper
//! ```
//!
//! `unpaper` is only needed for the `--clean` step of the primary attempt.

use crate::converter::PdfaConverter;
use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Number of trailing stderr lines kept as the failure message
const STDERR_TAIL_LINES: usize = 5;

/// Exit codes documented by `ocrmypdf`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrmypdfExitCode {
    Ok,
    BadArgs,
    InputFile,
    MissingDependency,
    InvalidOutputPdf,
    FileAccessError,
    AlreadyDoneOcr,
    ChildProcessError,
    EncryptedPdf,
    InvalidConfig,
    PdfaConversionFailed,
    OtherError,
    CtrlC,
}

impl OcrmypdfExitCode {
    pub fn from_code(code: i32) -> Option<Self> {
        let exit = match code {
            0 => OcrmypdfExitCode::Ok,
            1 => OcrmypdfExitCode::BadArgs,
            2 => OcrmypdfExitCode::InputFile,
            3 => OcrmypdfExitCode::MissingDependency,
            4 => OcrmypdfExitCode::InvalidOutputPdf,
            5 => OcrmypdfExitCode::FileAccessError,
            6 => OcrmypdfExitCode::AlreadyDoneOcr,
            7 => OcrmypdfExitCode::ChildProcessError,
            8 => OcrmypdfExitCode::EncryptedPdf,
            9 => OcrmypdfExitCode::InvalidConfig,
            10 => OcrmypdfExitCode::PdfaConversionFailed,
            15 => OcrmypdfExitCode::OtherError,
            130 => OcrmypdfExitCode::CtrlC,
            _ => return None,
        };
        Some(exit)
    }

    pub fn code(&self) -> i32 {
        match self {
            OcrmypdfExitCode::Ok => 0,
            OcrmypdfExitCode::BadArgs => 1,
            OcrmypdfExitCode::InputFile => 2,
            OcrmypdfExitCode::MissingDependency => 3,
            OcrmypdfExitCode::InvalidOutputPdf => 4,
            OcrmypdfExitCode::FileAccessError => 5,
            OcrmypdfExitCode::AlreadyDoneOcr => 6,
            OcrmypdfExitCode::ChildProcessError => 7,
            OcrmypdfExitCode::EncryptedPdf => 8,
            OcrmypdfExitCode::InvalidConfig => 9,
            OcrmypdfExitCode::PdfaConversionFailed => 10,
            OcrmypdfExitCode::OtherError => 15,
            OcrmypdfExitCode::CtrlC => 130,
        }
    }

    /// Fallback message when the engine printed nothing useful
    pub fn description(&self) -> &'static str {
        match self {
            OcrmypdfExitCode::Ok => "conversion succeeded",
            OcrmypdfExitCode::BadArgs => "invalid arguments",
            OcrmypdfExitCode::InputFile => "input file is not a valid PDF",
            OcrmypdfExitCode::MissingDependency => "a required helper program is missing",
            OcrmypdfExitCode::InvalidOutputPdf => "output file failed validation",
            OcrmypdfExitCode::FileAccessError => "could not read input or write output",
            OcrmypdfExitCode::AlreadyDoneOcr => "page already has text",
            OcrmypdfExitCode::ChildProcessError => "a helper program failed",
            OcrmypdfExitCode::EncryptedPdf => "input PDF is encrypted",
            OcrmypdfExitCode::InvalidConfig => "invalid OCR engine configuration",
            OcrmypdfExitCode::PdfaConversionFailed => "PDF/A conversion failed",
            OcrmypdfExitCode::OtherError => "unexpected engine error",
            OcrmypdfExitCode::CtrlC => "engine was interrupted",
        }
    }
}

impl fmt::Display for OcrmypdfExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Configuration for [`OcrmypdfConverter`]
#[derive(Debug, Clone)]
pub struct OcrmypdfConfig {
    /// Program to execute, looked up on `PATH` when not absolute
    pub program: PathBuf,

    /// Abandon an attempt after this long; the child is killed
    pub timeout: Option<Duration>,
}

impl Default for OcrmypdfConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ocrmypdf"),
            timeout: None,
        }
    }
}

/// [`PdfaConverter`] backed by the `ocrmypdf` executable
#[derive(Debug, Clone, Default)]
pub struct OcrmypdfConverter {
    config: OcrmypdfConfig,
}

impl OcrmypdfConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OcrmypdfConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrmypdfConfig {
        &self.config
    }

    /// Ask the engine for its version, used to report availability at startup
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ConversionError::EngineFailed {
                code: output.status.code(),
                message: stderr_tail(&output.stderr)
                    .unwrap_or_else(|| "version probe failed".to_string()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn spawn_error(&self, error: std::io::Error) -> ConversionError {
        if error.kind() == ErrorKind::NotFound {
            ConversionError::EngineNotAvailable(format!(
                "{} not found; install ocrmypdf or point the configuration at it",
                self.config.program.display()
            ))
        } else {
            ConversionError::Io(error)
        }
    }
}

#[async_trait]
impl PdfaConverter for OcrmypdfConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        options.validate()?;

        let args = options.to_args();
        debug!(
            program = %self.config.program.display(),
            args = ?args,
            input = %input.display(),
            output = %output.display(),
            "Spawning ocrmypdf"
        );

        let child = Command::new(&self.config.program)
            .args(&args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let started = Instant::now();
        let finished = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    warn!(timeout = ?limit, input = %input.display(), "ocrmypdf timed out");
                    ConversionError::Timeout(limit)
                })??,
            None => child.wait_with_output().await?,
        };
        let elapsed = started.elapsed();

        let message = stderr_tail(&finished.stderr);
        match finished.status.code() {
            Some(0) => {
                if tokio::fs::metadata(output).await.is_err() {
                    return Err(ConversionError::EngineFailed {
                        code: Some(0),
                        message: "engine reported success but wrote no output".to_string(),
                    });
                }
                info!(elapsed_ms = elapsed.as_millis() as u64, "ocrmypdf finished");
                Ok(())
            }
            Some(code) if code == OcrmypdfExitCode::AlreadyDoneOcr.code() => {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "ocrmypdf found prior OCR");
                Err(ConversionError::PriorOcrFound(message.unwrap_or_else(|| {
                    OcrmypdfExitCode::AlreadyDoneOcr.description().to_string()
                })))
            }
            Some(code) => {
                let message = message.unwrap_or_else(|| match OcrmypdfExitCode::from_code(code) {
                    Some(exit) => exit.description().to_string(),
                    None => format!("ocrmypdf exited with status {code}"),
                });
                warn!(code, error = %message, "ocrmypdf failed");
                Err(ConversionError::EngineFailed {
                    code: Some(code),
                    message,
                })
            }
            None => {
                let message = message.unwrap_or_else(|| "ocrmypdf was terminated".to_string());
                warn!(error = %message, "ocrmypdf terminated by signal");
                Err(ConversionError::EngineFailed {
                    code: None,
                    message,
                })
            }
        }
    }

    fn engine_name(&self) -> &str {
        "ocrmypdf"
    }
}

/// Last few non-empty lines of the engine's stderr
fn stderr_tail(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return None;
    }

    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    Some(lines[start..].join("\n"))
}
