//! Footfall HTTP API
//!
//! HTTP layer for the collector, built with Axum.
//!
//! # Endpoints
//!
//! ## Events
//! - `POST /api/visit` - Record a page view
//! - `POST /api/download` - Record a download
//!
//! ## Stats
//! - `GET /api/stats?date=YYYY-MM-DD` - One local day
//! - `GET /api/stats?scope=overall` - All time
//!
//! ## Health
//! - `GET /healthz` - Liveness probe
//!
//! Any other path is looked up under the configured static directory.
//!
//! Every response carries CORS headers that echo the request origin, and
//! an `x-request-id` that is generated when the client did not send one.
//!
//! # Example
//!
//! ```rust,ignore
//! use footfall::api::{serve, AppState};
//! use footfall::config::Config;
//! use footfall::storage::RecordStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let store = Arc::new(RecordStore::open(&config.storage).await?);
//!     let timezone = config.metrics.timezone()?;
//!
//!     serve(AppState::new(store, timezone, config.api)).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, JSON_CONTENT_TYPE};
pub use state::AppState;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/visit",
            post(routes::events::record_visit).fallback(method_not_allowed),
        )
        .route(
            "/api/download",
            post(routes::events::record_download).fallback(method_not_allowed),
        )
        .route(
            "/api/stats",
            get(routes::stats::get_stats).fallback(method_not_allowed),
        )
        .route(
            "/healthz",
            get(routes::health::healthz).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ));

    let assets =
        ServeDir::new(&state.config.static_dir).not_found_service(not_found.into_service());

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .merge(api_routes)
        .fallback_service(assets)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer())
        .with_state(shared_state)
}

/// CORS policy: any origin, echoed back with credentials allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Fallback for the static directory
async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

/// Known API path called with a method it does not serve
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let static_dir = state.config.static_dir.clone();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        static_dir = %static_dir.display(),
        "Footfall API listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Footfall API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
