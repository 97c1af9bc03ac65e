//! Field normalization for incoming events
//!
//! Client payloads are untrusted and loosely shaped. Every field is pulled
//! out of the JSON object and coerced explicitly; nothing here fails except
//! a body that is not valid JSON at all.

use axum::http::{header, HeaderMap};
use serde_json::{Map, Value};
use std::net::IpAddr;

/// Longest session id kept, in characters
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Placeholder stored when no client address is known
pub const UNKNOWN_IP: &str = "unknown";

/// The request body could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),
}

/// Decode a request body into a JSON object.
///
/// An empty body, or valid JSON that is not an object, becomes an empty
/// object.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, PayloadError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body).map_err(PayloadError::InvalidJson)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Canonicalize a client address
pub fn normalize_ip(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return UNKNOWN_IP.to_string();
    }

    if let Some(v4) = value
        .strip_prefix("::ffff:")
        .or_else(|| value.strip_prefix("::FFFF:"))
    {
        return v4.to_string();
    }

    if value == "::1" {
        return "127.0.0.1".to_string();
    }

    value.to_string()
}

/// Resolve the normalized client address of a request.
///
/// The first `X-Forwarded-For` entry wins; otherwise the transport peer.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => normalize_ip(ip),
        (None, Some(peer)) => normalize_ip(&peer.to_string()),
        (None, None) => normalize_ip(""),
    }
}

/// Header value as a string, empty when absent or not valid text
pub fn header_string(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Trim and cap a session id; anything unusable becomes `None`
pub fn sanitize_session_id(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(MAX_SESSION_ID_LEN).collect())
}

/// A string field, or `None` for any other type
pub fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Free-form metadata: objects and arrays are kept as-is
pub fn meta_field(value: Option<&Value>) -> Option<Value> {
    match value {
        Some(v @ Value::Object(_)) | Some(v @ Value::Array(_)) => Some(v.clone()),
        _ => None,
    }
}
