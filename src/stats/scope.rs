//! Aggregation scope: one calendar day or all time
//!
//! Parsing lives here so the HTTP boundary and the report CLI reject the
//! same inputs with the same messages. The aggregator only ever sees a
//! validated [`Scope`].

use chrono::NaiveDate;
use thiserror::Error;

/// Which records a summary covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Records whose local date equals this day
    Day(NaiveDate),
    /// Every record
    AllTime,
}

/// Rejected scope input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Query parameter \"date\" (YYYY-MM-DD) is required")]
    MissingDate,

    #[error("Invalid date format; expected YYYY-MM-DD")]
    InvalidDate(String),
}

impl Scope {
    /// Parse a `YYYY-MM-DD` date that must also exist on the calendar
    pub fn parse_date(s: &str) -> Result<Scope, ScopeError> {
        let invalid = || ScopeError::InvalidDate(s.to_string());

        let shape = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").map_err(|_| invalid())?;
        if !shape.is_match(s) {
            return Err(invalid());
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Scope::Day)
            .map_err(|_| invalid())
    }

    /// Resolve the `date` / `scope` query parameters.
    ///
    /// `scope=overall` or `date=all` select all time; otherwise `date` is
    /// required and must be a valid day.
    pub fn from_params(date: Option<&str>, scope: Option<&str>) -> Result<Scope, ScopeError> {
        if scope == Some("overall") || date == Some("all") {
            return Ok(Scope::AllTime);
        }

        match date {
            None | Some("") => Err(ScopeError::MissingDate),
            Some(d) => Self::parse_date(d),
        }
    }

    /// The `YYYY-MM-DD` key records are matched against
    pub fn date_key(&self) -> Option<String> {
        match self {
            Scope::Day(day) => Some(day.format("%Y-%m-%d").to_string()),
            Scope::AllTime => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            Scope::AllTime => write!(f, "all"),
        }
    }
}
