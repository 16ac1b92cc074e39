//! PageOCR Server - HTTP API for page images and OCR transcripts
//!
//! - PUT    /page/{filename} - Store or replace a page image
//! - GET    /page/{filename} - Transcript (Accept: text/plain | text/html)
//! - DELETE /page/{filename} - Remove the image and its transcripts

use std::net::SocketAddr;
use std::process::ExitCode;

use pageocr_server::{create_router, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pageocr_server=info,pageocr_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("Starting PageOCR Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config.pages.image_root.display(), "Image root");
    tracing::info!(path = %config.pages.transcript_root.display(), "Transcript root");
    tracing::info!(
        engine = %config.pages.engine_path.display(),
        timeout_secs = config.pages.ocr_timeout.as_secs(),
        "OCR engine"
    );

    let app = match create_router(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Invalid PAGEOCR_ALLOWED_IPS pattern");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("PageOCR Server listening on {}", addr);

    // Peer addresses feed the access gate and the rate limiter.
    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
