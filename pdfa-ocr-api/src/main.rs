use clap::Parser;
use pdfa_ocr::{MockConverter, MockMode, OcrmypdfConverter, PdfaConverter};
use pdfa_ocr_api::{app, AppState, Args, EngineKind};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfa_ocr_api=debug,pdfa_ocr=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config();

    let converter: Arc<dyn PdfaConverter> = match config.engine {
        EngineKind::Ocrmypdf => {
            let converter = OcrmypdfConverter::with_config(config.engine_config());
            match converter.version().await {
                Ok(version) => info!(version = %version, "Using ocrmypdf"),
                Err(e) => warn!(error = %e, "ocrmypdf is not usable, conversions will fail"),
            }
            Arc::new(converter)
        }
        EngineKind::Mock => {
            warn!("Running with the mock engine, uploads are returned unconverted");
            Arc::new(MockConverter::new(MockMode::Succeed))
        }
    };

    let state = AppState::new(config.clone(), converter);
    state.artifacts().ensure().await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("PDF to PDF/A converter listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = state.artifacts().sweep().await;
    info!(
        removed = report.removed,
        failed = report.failed,
        "Cleaned up upload and output directories"
    );

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
