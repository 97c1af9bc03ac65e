//! # Footfall
//!
//! A small analytics collector: clients report page visits and downloads,
//! each event is appended as one JSON line to a per-category log, and
//! summaries are computed on demand for a single local day or for all time.
//!
//! ## Modules
//!
//! - [`storage`]: Append-only NDJSON record logs
//! - [`ingest`]: Normalization of raw client events
//! - [`stats`]: Aggregation of records into summaries
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use footfall::config::StorageConfig;
//! use footfall::ingest::{Ingestor, MetricsTimezone, RequestContext};
//! use footfall::stats::Aggregator;
//! use footfall::storage::RecordStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RecordStore::open(&StorageConfig::new("data/logs")).await?);
//!     let ingestor = Ingestor::new(Arc::clone(&store), MetricsTimezone::default());
//!
//!     let payload = serde_json::json!({"days": ["mon", "tue"]});
//!     let payload = payload.as_object().cloned().unwrap_or_default();
//!     ingestor.record_download(&RequestContext::default(), &payload).await?;
//!
//!     let summary = Aggregator::new(store).overall().await?;
//!     println!("{}", serde_json::to_string_pretty(&summary)?);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod stats;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Category, DownloadRecord, EventHeader, LogRecord, RecordStore, StorageError, StorageResult,
    SyncMode, VisitRecord,
};

pub use ingest::{Ingestor, MetricsTimezone, PayloadError, RequestContext};

pub use stats::{Aggregator, ComboCount, Scope, ScopeError, StatsSummary};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, MetricsConfig, StorageConfig};
