//! Server configuration
//!
//! [`ServerConfig`] is what the router and handlers see. The binary builds it
//! from [`Args`], which accepts every setting as a flag or an environment
//! variable; tests construct it directly.

use clap::{Parser, ValueEnum};
use pdfa_ocr::{ConversionOptions, OcrmypdfConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// What happens to the converted file once it has been handed to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputRetention {
    /// Keep it until the shutdown sweep
    #[default]
    Retain,
    /// Unlink it as soon as the response stream has it open
    DeleteAfterSend,
}

/// Conversion engine backing the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EngineKind {
    #[default]
    Ocrmypdf,
    /// Copies uploads through unchanged, for running without the engine installed
    Mock,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub engine: EngineKind,
    pub ocrmypdf: PathBuf,
    /// OCR language passed to both attempts
    pub language: Option<String>,
    /// Per-attempt limit, unlimited when unset
    pub conversion_timeout: Option<Duration>,
    /// Request body limit, unlimited when unset
    pub max_upload_bytes: Option<usize>,
    pub retention: OutputRetention,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            upload_dir: PathBuf::from("./uploads"),
            output_dir: PathBuf::from("./outputs"),
            engine: EngineKind::Ocrmypdf,
            ocrmypdf: PathBuf::from("ocrmypdf"),
            language: None,
            conversion_timeout: None,
            max_upload_bytes: None,
            retention: OutputRetention::Retain,
        }
    }
}

impl ServerConfig {
    /// Options for the first attempt
    pub fn primary_options(&self) -> ConversionOptions {
        self.with_language(ConversionOptions::primary())
    }

    /// Options for the attempt made after the prior-OCR signal
    pub fn fallback_options(&self) -> ConversionOptions {
        self.with_language(ConversionOptions::fallback())
    }

    pub fn engine_config(&self) -> OcrmypdfConfig {
        OcrmypdfConfig {
            program: self.ocrmypdf.clone(),
            timeout: self.conversion_timeout,
        }
    }

    fn with_language(&self, options: ConversionOptions) -> ConversionOptions {
        match &self.language {
            Some(language) => options.with_language(language.clone()),
            None => options,
        }
    }
}

/// Command-line arguments of the `pdfa-ocr-api` binary
#[derive(Parser, Debug)]
#[command(
    name = "pdfa-ocr-api",
    about = "HTTP service converting uploaded PDFs into searchable PDF/A",
    version
)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "PDFA_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Directory for uploaded files while they are converted
    #[arg(long, env = "PDFA_UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Directory for converted files
    #[arg(long, env = "PDFA_OUTPUT_DIR", default_value = "./outputs")]
    pub output_dir: PathBuf,

    /// Conversion engine
    #[arg(long, env = "PDFA_ENGINE", value_enum, default_value_t = EngineKind::Ocrmypdf)]
    pub engine: EngineKind,

    /// Path to the ocrmypdf executable
    #[arg(long, env = "PDFA_OCRMYPDF", default_value = "ocrmypdf")]
    pub ocrmypdf: PathBuf,

    /// OCR language, e.g. "eng" or "eng+deu"
    #[arg(long, env = "PDFA_LANGUAGE")]
    pub language: Option<String>,

    /// Abandon a conversion attempt after this many seconds
    #[arg(long, env = "PDFA_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Reject uploads larger than this many bytes
    #[arg(long, env = "PDFA_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// What to do with converted files after they are sent
    #[arg(long, env = "PDFA_RETENTION", value_enum, default_value_t = OutputRetention::Retain)]
    pub retention: OutputRetention,
}

impl Args {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            upload_dir: self.upload_dir,
            output_dir: self.output_dir,
            engine: self.engine,
            ocrmypdf: self.ocrmypdf,
            language: self.language,
            conversion_timeout: self.timeout_secs.map(Duration::from_secs),
            max_upload_bytes: self.max_upload_bytes,
            retention: self.retention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args_match_default_config() {
        let config = Args::parse_from(["pdfa-ocr-api"]).into_config();
        let default = ServerConfig::default();

        assert_eq!(config.bind_addr, default.bind_addr);
        assert_eq!(config.upload_dir, default.upload_dir);
        assert_eq!(config.output_dir, default.output_dir);
        assert_eq!(config.engine, EngineKind::Ocrmypdf);
        assert_eq!(config.conversion_timeout, None);
        assert_eq!(config.max_upload_bytes, None);
        assert_eq!(config.retention, OutputRetention::Retain);
    }

    #[test]
    fn test_args_override() {
        let config = Args::parse_from([
            "pdfa-ocr-api",
            "--bind",
            "127.0.0.1:9000",
            "--engine",
            "mock",
            "--language",
            "deu",
            "--timeout-secs",
            "120",
            "--max-upload-bytes",
            "1048576",
            "--retention",
            "delete-after-send",
        ])
        .into_config();

        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.engine, EngineKind::Mock);
        assert_eq!(config.conversion_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.max_upload_bytes, Some(1_048_576));
        assert_eq!(config.retention, OutputRetention::DeleteAfterSend);
        assert_eq!(config.primary_options().language.as_deref(), Some("deu"));
        assert_eq!(config.fallback_options().language.as_deref(), Some("deu"));
    }

    #[test]
    fn test_attempt_options_without_language() {
        let config = ServerConfig::default();
        assert_eq!(config.primary_options(), ConversionOptions::primary());
        assert_eq!(config.fallback_options(), ConversionOptions::fallback());
    }

    #[test]
    fn test_engine_config() {
        let config = ServerConfig {
            ocrmypdf: PathBuf::from("/opt/ocrmypdf/bin/ocrmypdf"),
            conversion_timeout: Some(Duration::from_secs(5)),
            ..ServerConfig::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.program, PathBuf::from("/opt/ocrmypdf/bin/ocrmypdf"));
        assert_eq!(engine.timeout, Some(Duration::from_secs(5)));
    }
}
