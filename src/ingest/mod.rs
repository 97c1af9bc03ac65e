//! Event Ingestion
//!
//! Turns a raw client event into a normalized record and appends it:
//!
//! ```text
//! request ──► RequestContext (ip, user agent, referer)
//!    body ──► payload object ──► VisitRecord / DownloadRecord ──► RecordStore
//! ```
//!
//! The instant of receipt always comes from the server clock; a timestamp
//! sent by the client is ignored. The local date is derived from that
//! instant with the configured [`MetricsTimezone`].

pub mod normalize;
pub mod timezone;

pub use normalize::{
    header_string, meta_field, normalize_ip, parse_payload, resolve_client_ip,
    sanitize_session_id, string_field, PayloadError,
};
pub use timezone::MetricsTimezone;

use crate::storage::{
    days_from_value, Category, DownloadRecord, EventHeader, RecordStore, StorageResult,
    VisitRecord,
};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::sync::Arc;

/// Request-level facts that go into every record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Normalized client address
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    /// `path` query parameter, used when the body has none
    pub query_path: Option<String>,
}

impl RequestContext {
    /// Collect the context from request headers and the peer address
    pub fn from_request(headers: &HeaderMap, peer: Option<IpAddr>) -> Self {
        Self {
            ip: resolve_client_ip(headers, peer),
            user_agent: header_string(headers, header::USER_AGENT),
            referer: header_string(headers, header::REFERER),
            query_path: None,
        }
    }

    pub fn with_query_path(mut self, path: Option<String>) -> Self {
        self.query_path = path;
        self
    }
}

/// Normalizes events and hands them to the record store
pub struct Ingestor {
    store: Arc<RecordStore>,
    timezone: MetricsTimezone,
}

impl Ingestor {
    pub fn new(store: Arc<RecordStore>, timezone: MetricsTimezone) -> Self {
        Self { store, timezone }
    }

    /// Record a visit received now
    pub async fn record_visit(
        &self,
        ctx: &RequestContext,
        payload: &Map<String, Value>,
    ) -> StorageResult<VisitRecord> {
        let record = build_visit(Utc::now(), &self.timezone, ctx, payload);
        self.store.append(&record).await?;

        tracing::debug!(ip = %record.header.ip, path = %record.path, "Visit recorded");
        Ok(record)
    }

    /// Record a download received now
    pub async fn record_download(
        &self,
        ctx: &RequestContext,
        payload: &Map<String, Value>,
    ) -> StorageResult<DownloadRecord> {
        let record = build_download(Utc::now(), &self.timezone, ctx, payload);
        self.store.append(&record).await?;

        tracing::debug!(ip = %record.header.ip, days = ?record.days, "Download recorded");
        Ok(record)
    }
}

/// Format an instant the way records store it: UTC, millisecond precision
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_header(
    kind: Category,
    now: DateTime<Utc>,
    timezone: &MetricsTimezone,
    ctx: &RequestContext,
    payload: &Map<String, Value>,
) -> EventHeader {
    let local_date = timezone.local_date(now).format("%Y-%m-%d").to_string();

    EventHeader {
        kind,
        timestamp: format_timestamp(now),
        date: local_date.clone(),
        local_date,
        ip: ctx.ip.clone(),
        session_id: sanitize_session_id(payload.get("sessionId")),
        user_agent: ctx.user_agent.clone(),
        referer: ctx.referer.clone(),
    }
}

/// Build the visit record for an event received at `now`
pub fn build_visit(
    now: DateTime<Utc>,
    timezone: &MetricsTimezone,
    ctx: &RequestContext,
    payload: &Map<String, Value>,
) -> VisitRecord {
    let path = string_field(payload.get("path"))
        .or_else(|| ctx.query_path.clone())
        .unwrap_or_else(|| "/".to_string());

    VisitRecord {
        header: build_header(Category::Visit, now, timezone, ctx, payload),
        path,
        meta: meta_field(payload.get("meta")),
    }
}

/// Build the download record for an event received at `now`
pub fn build_download(
    now: DateTime<Utc>,
    timezone: &MetricsTimezone,
    ctx: &RequestContext,
    payload: &Map<String, Value>,
) -> DownloadRecord {
    DownloadRecord {
        header: build_header(Category::Download, now, timezone, ctx, payload),
        days: payload.get("days").map(days_from_value).unwrap_or_default(),
        filename: string_field(payload.get("filename")),
        meta: meta_field(payload.get("meta")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use serde_json::json;
    use tempfile::tempdir;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            ip: "198.51.100.4".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referer: "https://example.com/".to_string(),
            query_path: None,
        }
    }

    #[test]
    fn test_build_visit() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 16, 30, 0).unwrap();
        let tz = MetricsTimezone::Named(Tz::Asia__Seoul);

        let record = build_visit(
            now,
            &tz,
            &ctx(),
            &payload(json!({
                "sessionId": "  s-1 ",
                "path": "/calendar",
                "meta": {"w": 1280},
                "timestamp": "1999-01-01T00:00:00Z"
            })),
        );

        assert_eq!(record.header.kind, Category::Visit);
        assert_eq!(record.header.timestamp, "2024-05-01T16:30:00.000Z");
        assert_eq!(record.header.local_date, "2024-05-02");
        assert_eq!(record.header.date, "2024-05-02");
        assert_eq!(record.header.session_id.as_deref(), Some("s-1"));
        assert_eq!(record.header.user_agent, "Mozilla/5.0");
        assert_eq!(record.path, "/calendar");
        assert_eq!(record.meta, Some(json!({"w": 1280})));
    }

    #[test]
    fn test_visit_path_fallbacks() {
        let now = Utc::now();
        let tz = MetricsTimezone::Named(Tz::UTC);

        let from_query = build_visit(
            now,
            &tz,
            &ctx().with_query_path(Some("/q".to_string())),
            &Map::new(),
        );
        assert_eq!(from_query.path, "/q");

        let default = build_visit(now, &tz, &ctx(), &payload(json!({"path": 5})));
        assert_eq!(default.path, "/");
        assert_eq!(default.header.session_id, None);
        assert_eq!(default.meta, None);
    }

    #[test]
    fn test_build_download() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        let tz = MetricsTimezone::Named(Tz::UTC);

        let record = build_download(
            now,
            &tz,
            &ctx(),
            &payload(json!({"days": [3, "4", 5.5], "filename": "plan.ics", "sessionId": 9})),
        );

        assert_eq!(record.header.kind, Category::Download);
        assert_eq!(record.header.local_date, "2024-05-01");
        assert_eq!(record.days, vec!["3", "4", "5.5"]);
        assert_eq!(record.filename.as_deref(), Some("plan.ics"));
        assert_eq!(record.header.session_id, None);

        let no_days = build_download(now, &tz, &ctx(), &payload(json!({"days": "3,4"})));
        assert!(no_days.days.is_empty());
        assert_eq!(no_days.filename, None);
    }

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "agent".parse().unwrap());
        headers.insert("x-forwarded-for", "::ffff:203.0.113.8".parse().unwrap());

        let ctx = RequestContext::from_request(&headers, None);
        assert_eq!(ctx.ip, "203.0.113.8");
        assert_eq!(ctx.user_agent, "agent");
        assert_eq!(ctx.referer, "");
    }

    #[tokio::test]
    async fn test_record_visit_appends() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordStore::open(&StorageConfig::new(dir.path())).await.unwrap());
        let ingestor = Ingestor::new(Arc::clone(&store), MetricsTimezone::Named(Tz::UTC));

        let record = ingestor
            .record_visit(&ctx(), &payload(json!({"sessionId": "abc"})))
            .await
            .unwrap();

        let loaded = store.load_all::<VisitRecord>().await.unwrap();
        assert_eq!(loaded.records.last(), Some(&record));
    }

    #[tokio::test]
    async fn test_record_download_appends() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordStore::open(&StorageConfig::new(dir.path())).await.unwrap());
        let ingestor = Ingestor::new(Arc::clone(&store), MetricsTimezone::default());

        let record = ingestor
            .record_download(&ctx(), &payload(json!({"days": ["a", "b"]})))
            .await
            .unwrap();

        let loaded = store.load_all::<DownloadRecord>().await.unwrap();
        assert_eq!(loaded.records, vec![record]);
    }
}
