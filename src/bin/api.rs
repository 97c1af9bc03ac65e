//! Footfall API Server
//!
//! Run with: cargo run --bin footfall-api
//!
//! # Configuration
//!
//! Reads `footfall.toml` (see `footfall::config`) and then environment
//! variables:
//! - `HOST`: Host to bind to (default: 0.0.0.0)
//! - `PORT`: Port to listen on (default: 5174)
//! - `METRICS_TZ`: Timezone for local dates (default: Asia/Seoul)
//! - `FOOTFALL_LOG_DIR`: Directory for the event logs (default: data/logs)
//! - `FOOTFALL_STATIC_DIR`: Directory served for non-API paths (default: .)
//! - `RUST_LOG`: Log filter (default: footfall=info,tower_http=info)

use footfall::api::{serve, AppState};
use footfall::config::Config;
use footfall::logging::init_tracing;
use footfall::storage::RecordStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();

    // Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting Footfall API server v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    let timezone = config.metrics.timezone()?;

    tracing::info!(
        log_dir = %config.storage.log_dir.display(),
        sync_mode = ?config.storage.sync_mode,
        timezone = %timezone,
        "Configuration loaded"
    );

    let store = Arc::new(RecordStore::open(&config.storage).await?);
    let state = AppState::new(store, timezone, config.api);

    serve(state).await?;

    tracing::info!("Footfall API server stopped");
    Ok(())
}
