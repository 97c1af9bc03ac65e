//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! Event bodies are not listed here: they are arbitrary JSON and are
//! normalized field by field in [`crate::ingest`].

use serde::Serialize;

/// Decoded query string, in the order the client sent it
pub type QueryPairs = Vec<(String, String)>;

/// Value of the first occurrence of `key`; repeats are ignored
pub fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

// ============================================
// EVENT DTOs
// ============================================

/// Query parameters of `POST /api/visit`
#[derive(Debug, Default)]
pub struct VisitParams {
    /// Visited path, used when the body has none
    pub path: Option<String>,
}

impl VisitParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            path: first_value(pairs, "path"),
        }
    }
}

/// Response for an accepted event
#[derive(Debug, Serialize)]
pub struct AcceptedResponse<T> {
    pub ok: bool,
    pub received: T,
}

impl<T> AcceptedResponse<T> {
    pub fn new(received: T) -> Self {
        Self { ok: true, received }
    }
}

/// What was recorded for a visit
#[derive(Debug, Serialize)]
pub struct VisitReceipt {
    pub timestamp: String,
    pub ip: String,
}

/// What was recorded for a download
#[derive(Debug, Serialize)]
pub struct DownloadReceipt {
    pub timestamp: String,
    pub ip: String,
    pub days: Vec<String>,
}

// ============================================
// STATS DTOs
// ============================================

/// Query parameters of `GET /api/stats`
#[derive(Debug, Default)]
pub struct StatsParams {
    /// `YYYY-MM-DD` or `all`
    pub date: Option<String>,
    /// `overall` for all-time stats
    pub scope: Option<String>,
}

impl StatsParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            date: first_value(pairs, "date"),
            scope: first_value(pairs, "scope"),
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> QueryPairs {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_value_wins() {
        let query = pairs(&[("date", "2024-01-01"), ("scope", "overall"), ("date", "2024-01-02")]);
        let params = StatsParams::from_pairs(&query);

        assert_eq!(params.date.as_deref(), Some("2024-01-01"));
        assert_eq!(params.scope.as_deref(), Some("overall"));
    }

    #[test]
    fn test_missing_and_empty_values() {
        let query = pairs(&[("path", "")]);
        assert_eq!(VisitParams::from_pairs(&query).path.as_deref(), Some(""));
        assert_eq!(StatsParams::from_pairs(&query).date, None);
    }
}
