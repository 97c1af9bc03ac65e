//! Event record types persisted by the record store
//!
//! Every line of a log file is one of these records serialized as a JSON
//! object with camelCase keys:
//! - `VisitRecord`: a page visit
//! - `DownloadRecord`: a download of a set of "days"
//!
//! Both share an [`EventHeader`] that is flattened into the same object.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Category of an event; each category has its own log file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Visit,
    Download,
}

impl Category {
    /// File name of the log holding this category
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Category::Visit => "visits.ndjson",
            Category::Download => "downloads.ndjson",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Visit => write!(f, "visit"),
            Category::Download => write!(f, "download"),
        }
    }
}

/// Fields shared by every event record
///
/// Everything except `type` falls back to a default when missing or of the
/// wrong JSON type, so partially written or older records are still
/// readable. The log reader fills in `type` from the file a line came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    #[serde(rename = "type")]
    pub kind: Category,
    /// Instant of receipt, UTC with millisecond precision
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    /// Calendar date in the metrics timezone, fixed at write time
    #[serde(default, deserialize_with = "lenient_string")]
    pub local_date: String,
    /// Same value as `local_date`
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient_session_id")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_agent: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub referer: String,
}

impl EventHeader {
    /// Date used to place the record in a daily scope
    pub fn date_key(&self) -> &str {
        if self.local_date.is_empty() {
            &self.date
        } else {
            &self.local_date
        }
    }
}

/// A recorded page visit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(default = "default_path", deserialize_with = "lenient_path")]
    pub path: String,
    #[serde(default)]
    pub meta: Option<Value>,
}

fn default_path() -> String {
    "/".to_string()
}

/// A recorded download
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    #[serde(flatten)]
    pub header: EventHeader,
    /// Day identifiers included in the download, in client order
    #[serde(default, deserialize_with = "deserialize_days")]
    pub days: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub filename: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

/// A record that lives in one of the category logs
pub trait LogRecord: Serialize + DeserializeOwned + Send + 'static {
    /// Log this record type is stored in
    const CATEGORY: Category;

    fn header(&self) -> &EventHeader;
}

impl LogRecord for VisitRecord {
    const CATEGORY: Category = Category::Visit;

    fn header(&self) -> &EventHeader {
        &self.header
    }
}

impl LogRecord for DownloadRecord {
    const CATEGORY: Category = Category::Download;

    fn header(&self) -> &EventHeader {
        &self.header
    }
}

/// Coerce an arbitrary JSON value into a list of day identifiers.
///
/// Anything other than an array is an empty list. Elements are stringified
/// one by one and keep their order.
pub fn days_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(stringify_value).collect(),
        _ => Vec::new(),
    }
}

/// Render a JSON value the way a loosely typed client would print it
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                // f64 Display drops a trailing ".0"
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn deserialize_days<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(days_from_value(&value))
}

// Non-string values (including null) read as the field's empty value.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn lenient_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_else(default_path))
}

fn lenient_session_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.filter(|s| !s.trim().is_empty()))
}
