use crate::artifacts::{ArtifactDirs, RequestArtifacts};
use crate::config::{OutputRetention, ServerConfig};
use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Json, Multipart, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pdfa_ocr::{convert_to_pdfa, ConversionFailure, ConversionOptions, PdfaConverter};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Name shown by the health endpoint
pub const SERVICE_NAME: &str = "PDF to PDF/A Converter";

/// Multipart field carrying the uploaded document
pub const FILE_FIELD: &str = "file";

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// Application-specific error types for the API
#[derive(Debug, Error)]
pub enum AppError {
    /// The uploaded filename does not end in `.pdf`
    #[error("File must be a PDF")]
    InvalidInputKind,

    /// The multipart body has no `file` field
    #[error("No file provided in upload")]
    MissingFile,

    /// The multipart body could not be parsed
    #[error("Failed to read multipart data: {0}")]
    BadRequest(String),

    /// The upload exceeded the configured body limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Both attempts, or the only attempt, failed
    #[error(transparent)]
    Conversion(#[from] ConversionFailure),

    /// Storing or reading request files failed
    #[error("Error processing PDF: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInputKind | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Conversion(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            error: self.to_string(),
        };

        (self.status(), Json(error_response)).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    converter: Arc<dyn PdfaConverter>,
    artifacts: Arc<ArtifactDirs>,
    config: Arc<ServerConfig>,
    primary: Arc<ConversionOptions>,
    fallback: Arc<ConversionOptions>,
}

impl AppState {
    pub fn new(config: ServerConfig, converter: Arc<dyn PdfaConverter>) -> Self {
        let artifacts = ArtifactDirs::new(&config.upload_dir, &config.output_dir);
        Self {
            converter,
            artifacts: Arc::new(artifacts),
            primary: Arc::new(config.primary_options()),
            fallback: Arc::new(config.fallback_options()),
            config: Arc::new(config),
        }
    }

    pub fn artifacts(&self) -> &ArtifactDirs {
        &self.artifacts
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn converter(&self) -> &dyn PdfaConverter {
        self.converter.as_ref()
    }
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/convert/", post(convert_pdf))
        .route("/convert", post(convert_pdf))
        .route("/health", get(health_check))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.converter.engine_name(),
    }))
}

/// Whether `filename` carries the `.pdf` extension, in any letter case
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Convert an uploaded PDF into a searchable PDF/A document
///
/// The upload is stored under a fresh identifier, converted with the primary
/// options and, if the engine reports existing OCR text, once more with the
/// fallback options. The stored upload is removed before this returns, on
/// every path.
pub async fn convert_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A part without a filename is a plain form value, not an upload
        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(AppError::MissingFile);
        };
        if !has_pdf_extension(&filename) {
            info!(filename = %filename, "Rejected upload without .pdf extension");
            return Err(AppError::InvalidInputKind);
        }

        let artifacts = state.artifacts.allocate().await?;
        let bytes = store_upload(field, artifacts.input_path()).await?;
        info!(
            request_id = %artifacts.id(),
            filename = %filename,
            bytes,
            "Stored upload"
        );

        upload = Some((filename, artifacts));
        break;
    }

    let (filename, artifacts) = upload.ok_or(AppError::MissingFile)?;

    match convert_to_pdfa(
        state.converter.as_ref(),
        artifacts.input_path(),
        artifacts.output_path(),
        &state.primary,
        &state.fallback,
    )
    .await
    {
        Ok(attempt) => {
            info!(request_id = %artifacts.id(), attempt = %attempt, "Conversion finished");
            pdf_response(&artifacts, &filename, state.config.retention).await
        }
        Err(failure) => {
            warn!(
                request_id = %artifacts.id(),
                attempt = %failure.attempt(),
                error = %failure,
                "Conversion failed"
            );
            artifacts.discard_output().await;
            Err(failure.into())
        }
    }
}

/// Copy the field's bytes verbatim to `path`
async fn store_upload(mut field: Field<'_>, path: &Path) -> Result<u64, AppError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Stream the converted file back as an attachment
async fn pdf_response(
    artifacts: &RequestArtifacts,
    original_filename: &str,
    retention: OutputRetention,
) -> Result<Response, AppError> {
    let output = artifacts.output_path();
    let file = tokio::fs::File::open(output).await?;
    let length = file.metadata().await?.len();

    if retention == OutputRetention::DeleteAfterSend {
        // The open handle keeps the data readable after unlinking
        if let Err(e) = tokio::fs::remove_file(output).await {
            warn!(request_id = %artifacts.id(), error = %e, "Cannot remove sent output");
        }
    }

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(original_filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// `attachment; filename="converted_<original>"`
///
/// Names that cannot travel as a plain quoted string get an ASCII stand-in in
/// `filename` and the exact name in `filename*` (RFC 5987).
pub fn content_disposition(original_filename: &str) -> HeaderValue {
    let filename = format!("converted_{original_filename}");

    let value = if filename.chars().all(is_quotable) {
        format!("attachment; filename=\"{filename}\"")
    } else {
        let fallback: String = filename
            .chars()
            .map(|c| if is_quotable(c) { c } else { '_' })
            .collect();
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            encode_ext_value(&filename)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn is_quotable(c: char) -> bool {
    (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\'
}

/// Percent-encode everything outside RFC 5987 `attr-char`
fn encode_ext_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
