//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::ApiConfig;
use crate::ingest::{Ingestor, MetricsTimezone};
use crate::stats::Aggregator;
use crate::storage::RecordStore;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Normalizes and appends incoming events
    pub ingestor: Arc<Ingestor>,
    /// Computes summaries for `/api/stats`
    pub aggregator: Arc<Aggregator>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, timezone: MetricsTimezone, config: ApiConfig) -> Self {
        Self {
            ingestor: Arc::new(Ingestor::new(Arc::clone(&store), timezone)),
            aggregator: Arc::new(Aggregator::new(store)),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
