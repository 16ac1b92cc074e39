//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use pageocr_core::{OcrEngine, PageController, TesseractEngine};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::{require_access, AccessGate};
use crate::config::Config;
use crate::handlers::{delete_page, get_page, health, put_page, ready};
use crate::openapi::ApiDoc;
use crate::state::{AppState, EngineProbe};

/// Build shared state for `config`, driving `engine`.
///
/// Fails only if an IP pattern does not compile.
pub fn build_state(config: &Config, engine: Arc<dyn OcrEngine>) -> Result<AppState, regex::Error> {
    let gate = AccessGate::new(config.auth_tokens.clone(), &config.allowed_ips)?;
    if gate.is_enforcing() {
        tracing::info!(
            tokens = config.auth_tokens.len(),
            ip_patterns = config.allowed_ips.len(),
            "Access gate enabled"
        );
    } else {
        tracing::warn!("Access gate: DISABLED (no tokens or IP patterns configured)");
    }

    let pages = PageController::new(config.pages.clone(), engine);
    Ok(AppState::new(
        pages,
        gate,
        config.max_image_size_mb * 1024 * 1024,
        EngineProbe::new(Duration::from_secs(config.health_cache_secs)),
    ))
}

/// Create the application router running the configured OCR executable
pub fn create_router(config: &Config) -> Result<Router, regex::Error> {
    let engine = Arc::new(TesseractEngine::from_config(&config.pages));
    let state = build_state(config, engine)?;
    Ok(create_router_with_state(config, state))
}

/// Create the application router around prepared state
pub fn create_router_with_state(config: &Config, state: AppState) -> Router {
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static("x-auth-key"),
                ])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    // Gate applies to page routes only; probes stay reachable.
    let pages = Router::new()
        .route(
            "/page/{filename}",
            get(get_page).put(put_page).delete(delete_page),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    let router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(pages)
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(timeout);

    if !config.rate_limit_enabled {
        tracing::warn!("Rate limiting: DISABLED");
        return router.layer(TraceLayer::new_for_http());
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_sec)
        .burst_size(config.rate_limit_burst)
        .finish();

    match governor_conf {
        Some(conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
            router
                .layer(GovernorLayer::new(Arc::new(conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => {
            tracing::error!(
                per_sec = config.rate_limit_per_sec,
                burst = config.rate_limit_burst,
                "Invalid rate limit settings, rate limiting DISABLED"
            );
            router.layer(TraceLayer::new_for_http())
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
