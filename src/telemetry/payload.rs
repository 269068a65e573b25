//! Payload normalization.
//!
//! Push messages carry one JSON object. Poll responses carry either one
//! object or an array ordered newest-first (the backend sorts `DESC`). Both
//! are turned into canonical [`Sample`]s here, before anything else sees them.

use super::field::{Field, FieldValue, TIMESTAMP_SYNONYMS};
use super::sample::Sample;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

/// A normalized payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Sample),
    /// Newest first, as delivered by the backend.
    Batch(Vec<Sample>),
}

impl Payload {
    /// Parse raw bytes from the bus or an HTTP body.
    pub fn parse(bytes: &[u8], received_at: DateTime<Utc>) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value, received_at)
    }

    pub fn from_value(value: Value, received_at: DateTime<Utc>) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Payload::Single(normalize_object(&map, received_at)?)),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(DashboardError::EmptyPayload);
                }
                let total = items.len();
                let samples: Vec<Sample> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, item)| match item {
                        Value::Object(map) => match normalize_object(map, received_at) {
                            Ok(sample) => Some(sample),
                            Err(e) => {
                                warn!("Skipping batch element {}: {}", idx, e);
                                None
                            }
                        },
                        other => {
                            warn!("Skipping non-object batch element {}: {}", idx, other);
                            None
                        }
                    })
                    .collect();
                if samples.is_empty() {
                    return Err(DashboardError::MalformedPayload(format!(
                        "none of {} batch elements could be normalized",
                        total
                    )));
                }
                Ok(Payload::Batch(samples))
            }
            other => Err(DashboardError::MalformedPayload(format!(
                "expected object or array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Turn one JSON object into a canonical sample.
///
/// Fails when the object carries none of the known fields.
pub fn normalize_object(map: &Map<String, Value>, received_at: DateTime<Utc>) -> Result<Sample> {
    let timestamp = TIMESTAMP_SYNONYMS
        .iter()
        .find_map(|name| map.get(*name).and_then(parse_timestamp))
        .unwrap_or(received_at);

    let mut sample = Sample::new(timestamp);
    for field in Field::iter() {
        let value = field
            .synonyms()
            .iter()
            .find_map(|name| map.get(*name).and_then(FieldValue::from_json));
        if let Some(value) = value {
            sample.set(field, value);
        }
    }

    if sample.is_empty() {
        return Err(DashboardError::MalformedPayload(
            "no recognised telemetry fields".to_string(),
        ));
    }
    Ok(sample)
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339, SQL `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC) and
/// integer epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
