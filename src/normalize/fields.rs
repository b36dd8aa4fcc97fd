//! Value extraction helpers shared by the platform field maps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::model::RawPayload;

/// Resolves a dotted path (`"public_metrics.like_count"`) inside a payload.
pub(crate) fn lookup<'a>(payload: &'a RawPayload, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = payload.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// First candidate path that holds a non-empty string (numbers are stringified).
pub(crate) fn first_string(payload: &RawPayload, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|path| match lookup(payload, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First candidate path that is present and not null.
pub(crate) fn first_value<'a>(payload: &'a RawPayload, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .find_map(|path| lookup(payload, path).filter(|v| !v.is_null()))
}

/// Coerces a counter value to a non-negative integer.
///
/// Accepts integers, floats (truncated) and numeric strings. Negative values
/// clamp to 0 and anything non-numeric counts as 0.
pub(crate) fn counter(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                u
            } else {
                n.as_f64().map(clamp_float).unwrap_or(0)
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(u) = s.parse::<u64>() {
                u
            } else {
                s.parse::<f64>().map(clamp_float).unwrap_or(0)
            }
        }
        _ => 0,
    }
}

fn clamp_float(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f as u64
    } else {
        0
    }
}

/// Parses any of the timestamp formats the platforms emit into UTC.
///
/// Offset-less values are taken as UTC. Bare dates resolve to midnight.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    // Twitter v1.1 `created_at`
    "%a %b %d %H:%M:%S %z %Y",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }

    None
}

/// Collects `#tag` or `@user` words from free text, without the marker.
pub(crate) fn extract_marked(text: &str, marker: char) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|word| word.strip_prefix(marker))
        .map(|tag| tag.trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '_')))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects string values of `key` from an array of objects at `path`.
pub(crate) fn string_list(payload: &RawPayload, path: &str, keys: &[&str]) -> Option<Vec<String>> {
    let items = lookup(payload, path)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                keys.iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect(),
    )
}

/// Truncates to `max` characters, appending `...` when anything was cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
