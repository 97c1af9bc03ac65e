//! Summary computation
//!
//! Pure functions over already loaded records:
//!
//! ```text
//! records ──► scope filter ──► counts / distinct ips / distinct sessions
//!                          └─► combination key ──► group ──► rank ──► top / others
//! ```

use crate::stats::scope::Scope;
use crate::storage::{DownloadRecord, LogRecord, VisitRecord};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Number of combination groups reported in `topDownloads`
pub const TOP_LIMIT: usize = 10;

/// Label of the group for downloads without any days
pub const UNKNOWN_COMBINATION: &str = "unknown";

/// Separator between day identifiers in a combination key
pub const COMBINATION_SEPARATOR: &str = "-";

/// One ranked combination group
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComboCount {
    pub label: String,
    pub count: usize,
}

impl ComboCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Ranked groups split at the top limit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboBreakdown {
    pub top: Vec<ComboCount>,
    pub others: Vec<ComboCount>,
}

/// Aggregated statistics for one scope
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    /// Present for daily summaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// `"all"` for all-time summaries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub visits: usize,
    pub unique_visitors: usize,
    pub unique_sessions: usize,
    pub downloads: usize,
    pub unique_download_ips: usize,
    pub unique_download_sessions: usize,
    #[serde(serialize_with = "serialize_rate")]
    pub conversion_rate: f64,
    pub top_downloads: Vec<ComboCount>,
    pub other_downloads: Vec<ComboCount>,
}

/// Summarize visits and downloads for a scope.
///
/// Records are expected in log order; the order matters for tie-breaking
/// between combination groups with equal counts.
pub fn summarize(scope: &Scope, visits: &[VisitRecord], downloads: &[DownloadRecord]) -> StatsSummary {
    let date_key = scope.date_key();

    let visits = in_scope(visits, date_key.as_deref());
    let downloads = in_scope(downloads, date_key.as_deref());

    let combos = rank_combinations(downloads.iter().copied(), TOP_LIMIT);

    StatsSummary {
        range: match scope {
            Scope::AllTime => Some("all".to_string()),
            Scope::Day(_) => None,
        },
        date: date_key,
        visits: visits.len(),
        unique_visitors: count_unique(visits.iter().map(|r| Some(r.header.ip.as_str()))),
        unique_sessions: count_unique(visits.iter().map(|r| r.header.session_id.as_deref())),
        downloads: downloads.len(),
        unique_download_ips: count_unique(downloads.iter().map(|r| Some(r.header.ip.as_str()))),
        unique_download_sessions: count_unique(
            downloads.iter().map(|r| r.header.session_id.as_deref()),
        ),
        conversion_rate: conversion_rate(visits.len(), downloads.len()),
        top_downloads: combos.top,
        other_downloads: combos.others,
    }
}

fn in_scope<'a, R: LogRecord>(records: &'a [R], date_key: Option<&str>) -> Vec<&'a R> {
    match date_key {
        Some(key) => records
            .iter()
            .filter(|r| r.header().date_key() == key)
            .collect(),
        None => records.iter().collect(),
    }
}

/// Number of distinct values, ignoring missing and empty ones
pub fn count_unique<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// `downloads / visits` rounded to three decimals; 0 when there are no visits
pub fn conversion_rate(visits: usize, downloads: usize) -> f64 {
    if visits == 0 {
        return 0.0;
    }

    let rate = downloads as f64 / visits as f64;
    (rate * 1000.0).round() / 1000.0
}

/// Combination key of a download
pub fn combination_key(days: &[String]) -> String {
    if days.is_empty() {
        UNKNOWN_COMBINATION.to_string()
    } else {
        days.join(COMBINATION_SEPARATOR)
    }
}

/// Group downloads by combination key and rank the groups.
///
/// Ranking is by descending count; groups with equal counts keep the order
/// in which their key first appeared.
pub fn rank_combinations<'a, I>(downloads: I, limit: usize) -> ComboBreakdown
where
    I: IntoIterator<Item = &'a DownloadRecord>,
{
    let mut groups: Vec<ComboCount> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in downloads {
        let key = combination_key(&record.days);
        match positions.get(&key) {
            Some(&idx) => groups[idx].count += 1,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(ComboCount::new(key, 1));
            }
        }
    }

    // sort_by is stable, so first appearance breaks ties
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    let others = if groups.len() > limit {
        groups.split_off(limit)
    } else {
        Vec::new()
    };

    ComboBreakdown { top: groups, others }
}

/// Whole rates are written as integers (`0`, `1`), others as decimals
fn serialize_rate<S: Serializer>(rate: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if rate.is_finite() && rate.fract() == 0.0 && rate.abs() < u64::MAX as f64 {
        serializer.serialize_u64(rate.abs() as u64)
    } else {
        serializer.serialize_f64(*rate)
    }
}
