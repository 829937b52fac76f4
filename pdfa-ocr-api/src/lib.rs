//! # pdfa-ocr-api
//!
//! REST API converting uploaded PDFs into searchable PDF/A documents
//!

mod api;
mod artifacts;
mod config;

pub use api::{
    app, content_disposition, convert_pdf, has_pdf_extension, health_check, AppError, AppState,
    ErrorResponse, FILE_FIELD, SERVICE_NAME,
};
pub use artifacts::{ArtifactDirs, RequestArtifacts, SweepReport};
pub use config::{Args, EngineKind, OutputRetention, ServerConfig};
