//! Footfall Record Store
//!
//! Durable persistence of event records:
//!
//! - **types**: Event records (visits, downloads) and their shared header
//! - **log**: Append-only NDJSON logs, one per category
//! - **error**: Error types
//!
//! # Layout
//!
//! ```text
//! <log_dir>/
//!   visits.ndjson      one VisitRecord per line
//!   downloads.ndjson   one DownloadRecord per line
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use footfall::config::StorageConfig;
//! use footfall::storage::{RecordStore, VisitRecord};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RecordStore::open(&StorageConfig::new("./data/logs")).await?;
//!
//!     let visits = store.load_all::<VisitRecord>().await?;
//!     println!("{} visits, {} unreadable lines", visits.records.len(), visits.skipped);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod log;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use log::{LoadedRecords, RecordLines, RecordStore, SyncMode};
pub use types::{
    days_from_value, stringify_value, Category, DownloadRecord, EventHeader, LogRecord,
    VisitRecord,
};
