//! Append-only NDJSON record logs
//!
//! One log file per [`Category`], one JSON object per line. Lines are only
//! ever appended; nothing is rewritten, compacted or deleted.
//!
//! Writers open the file in append mode and hand the whole line to a single
//! write, so concurrent appenders rely on the OS append atomicity for lines
//! below its buffering threshold. There is no locking.
//!
//! Readers are tolerant: a line that does not parse as a record is skipped
//! with a warning and counted, the rest of the log is still returned.

use crate::config::StorageConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Category, LogRecord};
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Sync strategy for appends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Fsync after every append
    EveryWrite,
    /// Flush to the OS, no fsync
    #[default]
    None,
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "every_write" | "every-write" | "always" => Ok(SyncMode::EveryWrite),
            "none" | "never" => Ok(SyncMode::None),
            other => Err(format!("unknown sync mode '{}'", other)),
        }
    }
}

/// Reader/writer for the per-category event logs
#[derive(Debug, Clone)]
pub struct RecordStore {
    log_dir: PathBuf,
    sync_mode: SyncMode,
}

impl RecordStore {
    /// Open the store, creating the log directory if needed
    pub async fn open(config: &StorageConfig) -> StorageResult<Self> {
        let log_dir = config.log_dir.clone();

        tokio::fs::create_dir_all(&log_dir)
            .await
            .map_err(|source| StorageError::LogDir {
                path: log_dir.clone(),
                source,
            })?;

        tracing::debug!(log_dir = ?log_dir, sync_mode = ?config.sync_mode, "Record store opened");

        Ok(Self {
            log_dir,
            sync_mode: config.sync_mode,
        })
    }

    /// Directory holding the log files
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path to the log file of a category
    pub fn log_path(&self, category: Category) -> PathBuf {
        self.log_dir.join(category.log_file_name())
    }

    /// Append a record as a single line to its category log
    pub async fn append<R: LogRecord>(&self, record: &R) -> StorageResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let path = self.log_path(R::CATEGORY);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        file.write_all(line.as_bytes()).await?;

        // tokio writes in the background; both calls wait for it to land
        match self.sync_mode {
            SyncMode::EveryWrite => file.sync_data().await?,
            SyncMode::None => file.flush().await?,
        }

        Ok(())
    }

    /// Read a category log and return a lazy iterator over its records.
    ///
    /// A missing log file yields an empty iterator.
    pub async fn records<R: LogRecord>(&self) -> StorageResult<RecordLines<R>> {
        let path = self.log_path(R::CATEGORY);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let source = String::from_utf8_lossy(&bytes).into_owned();
        Ok(RecordLines::new(R::CATEGORY, source))
    }

    /// Load every readable record of a category, in insertion order
    pub async fn load_all<R: LogRecord>(&self) -> StorageResult<LoadedRecords<R>> {
        let mut lines = self.records::<R>().await?;
        let records: Vec<R> = lines.by_ref().collect();

        Ok(LoadedRecords {
            records,
            skipped: lines.skipped(),
        })
    }
}

/// Records read from one log
#[derive(Debug, Clone)]
pub struct LoadedRecords<R> {
    pub records: Vec<R>,
    /// Number of malformed lines that were dropped
    pub skipped: usize,
}

impl<R> Default for LoadedRecords<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Iterator over the records of a log's contents.
///
/// Yields only lines that parse; malformed lines are logged and counted in
/// [`RecordLines::skipped`]. Blank lines are ignored without being counted.
pub struct RecordLines<R> {
    category: Category,
    source: String,
    offset: usize,
    line_no: usize,
    skipped: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: LogRecord> RecordLines<R> {
    pub fn new(category: Category, source: String) -> Self {
        Self {
            category,
            source,
            offset: 0,
            line_no: 0,
            skipped: 0,
            _record: PhantomData,
        }
    }

    /// Malformed lines seen so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: LogRecord> Iterator for RecordLines<R> {
    type Item = R;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.source.len() {
            let rest = &self.source[self.offset..];
            let (line, advance) = match rest.find('\n') {
                Some(end) => (&rest[..end], end + 1),
                None => (rest, rest.len()),
            };
            self.offset += advance;
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match decode_line::<R>(line) {
                Ok(record) => return Some(record),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(
                        file = self.category.log_file_name(),
                        line = self.line_no,
                        error = %e,
                        "Skipping malformed line"
                    );
                }
            }
        }

        None
    }
}

/// Decode one log line. A missing or unknown `type` is taken from the log
/// the line was read from; anything that is not a JSON object is malformed.
fn decode_line<R: LogRecord>(line: &str) -> Result<R, serde_json::Error> {
    let mut value: Value = serde_json::from_str(line)?;

    if let Value::Object(fields) = &mut value {
        let known = matches!(
            fields.get("type").and_then(Value::as_str),
            Some("visit") | Some("download")
        );
        if !known {
            fields.insert("type".to_string(), Value::String(R::CATEGORY.to_string()));
        }
    }

    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{DownloadRecord, EventHeader, VisitRecord};
    use serde_json::json;
    use tempfile::tempdir;

    fn header(kind: Category, date: &str, ip: &str) -> EventHeader {
        EventHeader {
            kind,
            timestamp: format!("{}T01:00:00.000Z", date),
            local_date: date.to_string(),
            date: date.to_string(),
            ip: ip.to_string(),
            session_id: None,
            user_agent: String::new(),
            referer: String::new(),
        }
    }

    fn visit(date: &str, ip: &str) -> VisitRecord {
        VisitRecord {
            header: header(Category::Visit, date, ip),
            path: "/".to_string(),
            meta: None,
        }
    }

    async fn create_test_store() -> (RecordStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path().join("logs"));
        let store = RecordStore::open(&config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_open_creates_log_dir() {
        let (store, _dir) = create_test_store().await;
        assert!(store.log_dir().is_dir());
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let (store, _dir) = create_test_store().await;

        let loaded = store.load_all::<VisitRecord>().await.unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.skipped, 0);
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let (store, _dir) = create_test_store().await;

        store.append(&visit("2024-05-01", "10.0.0.1")).await.unwrap();
        let last = DownloadRecord {
            header: header(Category::Download, "2024-05-01", "10.0.0.2"),
            days: vec!["1".to_string(), "2".to_string()],
            filename: Some("plan.ics".to_string()),
            meta: Some(json!({"source": "grid", "n": [1, 2]})),
        };
        store
            .append(&DownloadRecord {
                days: vec![],
                ..last.clone()
            })
            .await
            .unwrap();
        store.append(&last).await.unwrap();

        let visits = store.load_all::<VisitRecord>().await.unwrap();
        assert_eq!(visits.records.len(), 1);

        let downloads = store.load_all::<DownloadRecord>().await.unwrap();
        assert_eq!(downloads.records.len(), 2);
        assert_eq!(downloads.records.last(), Some(&last));
    }

    #[tokio::test]
    async fn test_one_line_per_record() {
        let (store, _dir) = create_test_store().await;

        for i in 0..3 {
            store
                .append(&visit("2024-05-01", &format!("10.0.0.{}", i)))
                .await
                .unwrap();
        }

        let raw = std::fs::read_to_string(store.log_path(Category::Visit)).unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.ends_with('\n'));
        for line in raw.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let (store, _dir) = create_test_store().await;

        store.append(&visit("2024-05-01", "10.0.0.1")).await.unwrap();
        store.append(&visit("2024-05-01", "10.0.0.2")).await.unwrap();

        // Torn write in the middle of the log
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(store.log_path(Category::Visit))
                .unwrap();
            file.write_all(b"{\"type\":\"visit\",\"ip\":\n\n42\n").unwrap();
        }

        store.append(&visit("2024-05-02", "10.0.0.3")).await.unwrap();

        let loaded = store.load_all::<VisitRecord>().await.unwrap();
        assert_eq!(loaded.records.len(), 3);
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.records[2].header.ip, "10.0.0.3");
    }

    #[tokio::test]
    async fn test_load_is_repeatable() {
        let (store, _dir) = create_test_store().await;

        store.append(&visit("2024-05-01", "10.0.0.1")).await.unwrap();
        store.append(&visit("2024-05-02", "10.0.0.2")).await.unwrap();

        let first = store.load_all::<VisitRecord>().await.unwrap();
        let second = store.load_all::<VisitRecord>().await.unwrap();
        assert_eq!(first.records, second.records);
    }

    #[tokio::test]
    async fn test_append_every_write_sync() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::new(dir.path());
        config.sync_mode = SyncMode::EveryWrite;
        let store = RecordStore::open(&config).await.unwrap();

        store.append(&visit("2024-05-01", "10.0.0.1")).await.unwrap();

        let loaded = store.load_all::<VisitRecord>().await.unwrap();
        assert_eq!(loaded.records.len(), 1);
    }

    #[test]
    fn test_record_lines_iterator() {
        let source = concat!(
            r#"{"type":"visit","localDate":"2024-01-01","ip":"a"}"#,
            "\n",
            "not json\n",
            "   \n",
            r#"{"type":"visit","localDate":"2024-01-02","ip":"b"}"#,
        )
        .to_string();

        let mut lines = RecordLines::<VisitRecord>::new(Category::Visit, source);
        let ips: Vec<String> = lines.by_ref().map(|r| r.header.ip).collect();

        assert_eq!(ips, vec!["a", "b"]);
        assert_eq!(lines.skipped(), 1);
    }

    #[test]
    fn test_loosely_shaped_lines_are_kept() {
        let source = [
            r#"{"type":"visit","localDate":"2024-01-01","ip":null}"#,
            r#"{"type":"visit","localDate":"2024-01-01","ip":"a","userAgent":null}"#,
            r#"{"type":"visit","localDate":"2024-01-01","ip":"b","sessionId":7}"#,
            r#"{"localDate":"2024-01-01","ip":"c"}"#,
            r#"{"type":"pageview","localDate":"2024-01-01","ip":"d"}"#,
        ]
        .join("\n");

        let mut lines = RecordLines::<VisitRecord>::new(Category::Visit, source);
        let records: Vec<VisitRecord> = lines.by_ref().collect();

        assert_eq!(lines.skipped(), 0);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].header.ip, "");
        assert_eq!(records[1].header.user_agent, "");
        assert_eq!(records[2].header.session_id, None);
        assert!(records.iter().all(|r| r.header.kind == Category::Visit));
    }

    #[test]
    fn test_download_line_without_type() {
        let source = r#"{"date":"2024-01-01","days":["x"]}"#.to_string();

        let records: Vec<DownloadRecord> =
            RecordLines::new(Category::Download, source).collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header.kind, Category::Download);
        assert_eq!(records[0].days, vec!["x"]);
    }

    #[test]
    fn test_sync_mode_from_str() {
        assert_eq!("every_write".parse::<SyncMode>(), Ok(SyncMode::EveryWrite));
        assert_eq!("NONE".parse::<SyncMode>(), Ok(SyncMode::None));
        assert!("sometimes".parse::<SyncMode>().is_err());
    }
}
