//! Timezone used to assign events to calendar days
//!
//! The local date of an event is computed once, when the event is written,
//! so stored records keep their day even if this setting changes later.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// A configured timezone for date derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsTimezone {
    /// IANA zone such as `Asia/Seoul` or `UTC`
    Named(Tz),
    /// Fixed offset such as `+09:00`
    Fixed(FixedOffset),
    /// The operating system zone; only used when configured as `local`
    Local,
}

impl MetricsTimezone {
    /// Calendar date of `instant` in this timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            MetricsTimezone::Named(tz) => instant.with_timezone(tz).date_naive(),
            MetricsTimezone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
            MetricsTimezone::Local => instant.with_timezone(&chrono::Local).date_naive(),
        }
    }

    /// Today's date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }
}

impl Default for MetricsTimezone {
    fn default() -> Self {
        MetricsTimezone::Named(Tz::Asia__Seoul)
    }
}

impl FromStr for MetricsTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("local") {
            return Ok(MetricsTimezone::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(MetricsTimezone::Named(Tz::UTC));
        }
        if s.starts_with('+') || s.starts_with('-') {
            return parse_offset(s)
                .map(MetricsTimezone::Fixed)
                .ok_or_else(|| format!("invalid UTC offset '{}'", s));
        }

        s.parse::<Tz>()
            .map(MetricsTimezone::Named)
            .map_err(|_| format!("unknown timezone '{}'", s))
    }
}

impl std::fmt::Display for MetricsTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsTimezone::Named(tz) => write!(f, "{}", tz.name()),
            MetricsTimezone::Fixed(offset) => write!(f, "{}", offset),
            MetricsTimezone::Local => write!(f, "local"),
        }
    }
}

/// Parse `+HH`, `+HHMM` or `+HH:MM` (and the `-` forms)
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let sign = match s.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };

    let digits: String = s[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };

    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
