//! Statistics Aggregator
//!
//! Reads both event logs and summarizes them for a [`Scope`]:
//!
//! 1. Load visits and downloads concurrently (malformed lines are skipped)
//! 2. Keep the records whose local date matches the scope
//! 3. Count, de-duplicate, rank download combinations
//!
//! Reads are not isolated from concurrent appends; a summary reflects
//! whatever prefix of each log was on disk when it was read.

pub mod scope;
pub mod summary;

pub use scope::{Scope, ScopeError};
pub use summary::{
    combination_key, conversion_rate, count_unique, rank_combinations, summarize, ComboBreakdown,
    ComboCount, StatsSummary, TOP_LIMIT,
};

use crate::storage::{DownloadRecord, RecordStore, StorageResult, VisitRecord};
use std::sync::Arc;
use std::time::Instant;

/// Computes summaries from the record store
pub struct Aggregator {
    store: Arc<RecordStore>,
}

impl Aggregator {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Summarize all records in `scope`
    pub async fn summarize(&self, scope: &Scope) -> StorageResult<StatsSummary> {
        let start = Instant::now();

        let (visits, downloads) = tokio::try_join!(
            self.store.load_all::<VisitRecord>(),
            self.store.load_all::<DownloadRecord>(),
        )?;

        if visits.skipped > 0 || downloads.skipped > 0 {
            tracing::warn!(
                skipped_visits = visits.skipped,
                skipped_downloads = downloads.skipped,
                "Malformed log lines were ignored"
            );
        }

        let summary = summarize(scope, &visits.records, &downloads.records);

        tracing::debug!(
            scope = %scope,
            visits = summary.visits,
            downloads = summary.downloads,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summary computed"
        );

        Ok(summary)
    }

    /// Summary for one day
    pub async fn daily(&self, day: chrono::NaiveDate) -> StorageResult<StatsSummary> {
        self.summarize(&Scope::Day(day)).await
    }

    /// Summary over every record
    pub async fn overall(&self) -> StorageResult<StatsSummary> {
        self.summarize(&Scope::AllTime).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::ingest::{Ingestor, MetricsTimezone, RequestContext};
    use crate::storage::Category;
    use chrono_tz::Tz;
    use serde_json::{json, Map, Value};
    use tempfile::tempdir;

    struct Fixture {
        store: Arc<RecordStore>,
        ingestor: Ingestor,
        aggregator: Aggregator,
        _dir: tempfile::TempDir,
    }

    async fn create_fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordStore::open(&StorageConfig::new(dir.path())).await.unwrap());
        Fixture {
            ingestor: Ingestor::new(Arc::clone(&store), MetricsTimezone::Named(Tz::UTC)),
            aggregator: Aggregator::new(Arc::clone(&store)),
            store,
            _dir: dir,
        }
    }

    fn ctx(ip: &str) -> RequestContext {
        RequestContext {
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let fx = create_fixture().await;

        let summary = fx.aggregator.overall().await.unwrap();
        assert_eq!(summary.range.as_deref(), Some("all"));
        assert_eq!(summary.visits, 0);
        assert_eq!(summary.downloads, 0);
        assert_eq!(summary.conversion_rate, 0.0);
        assert!(summary.top_downloads.is_empty());
        assert!(summary.other_downloads.is_empty());
    }

    #[tokio::test]
    async fn test_downloads_without_visits() {
        let fx = create_fixture().await;

        fx.ingestor
            .record_download(&ctx("10.0.0.1"), &payload(json!({"days": ["a"]})))
            .await
            .unwrap();

        let summary = fx.aggregator.overall().await.unwrap();
        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_daily_counts_today() {
        let fx = create_fixture().await;

        for ip in ["10.0.0.1", "10.0.0.1", "10.0.0.2"] {
            fx.ingestor
                .record_visit(&ctx(ip), &payload(json!({"sessionId": ip})))
                .await
                .unwrap();
        }
        fx.ingestor
            .record_download(&ctx("10.0.0.2"), &payload(json!({"days": [1, 2]})))
            .await
            .unwrap();

        let today = MetricsTimezone::Named(Tz::UTC).today();
        let summary = fx.aggregator.daily(today).await.unwrap();

        assert_eq!(summary.visits, 3);
        assert_eq!(summary.unique_visitors, 2);
        assert_eq!(summary.unique_sessions, 2);
        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.unique_download_ips, 1);
        assert_eq!(summary.conversion_rate, 0.333);
        assert_eq!(summary.top_downloads, vec![ComboCount::new("1-2", 1)]);

        let other_day = fx
            .aggregator
            .daily(chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(other_day.visits, 0);
    }

    #[tokio::test]
    async fn test_malformed_lines_do_not_break_summary() {
        let fx = create_fixture().await;

        fx.ingestor
            .record_visit(&ctx("10.0.0.1"), &Map::new())
            .await
            .unwrap();
        std::fs::write(
            fx.store.log_path(Category::Download),
            "garbage\n{\"type\":\"download\",\"days\":[\"x\"]}\n",
        )
        .unwrap();

        let summary = fx.aggregator.overall().await.unwrap();
        assert_eq!(summary.visits, 1);
        assert_eq!(summary.downloads, 1);
        assert_eq!(summary.top_downloads, vec![ComboCount::new("x", 1)]);
    }

    #[tokio::test]
    async fn test_visits_with_missing_ip_still_count() {
        let fx = create_fixture().await;

        std::fs::write(
            fx.store.log_path(Category::Visit),
            concat!(
                "{\"type\":\"visit\",\"date\":\"2024-01-01\",\"ip\":null}\n",
                "{\"date\":\"2024-01-01\",\"ip\":\"10.0.0.1\",\"sessionId\":7}\n",
            ),
        )
        .unwrap();

        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = fx.aggregator.daily(day).await.unwrap();
        assert_eq!(summary.visits, 2);
        assert_eq!(summary.unique_visitors, 1);
        assert_eq!(summary.unique_sessions, 0);
    }
}
