//! Field catalogue for WeatherTech samples.
//!
//! The backend and the devices are not consistent about field names: the
//! sensor node reports `air_clean_perc` while older rows carry `air_clean`,
//! and the gateway prefixes its system values with `g_`. Every field has a
//! declared list of wire names; when several are present the first one wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    /// Air temperature (°C)
    Temperature,
    /// Relative humidity (%)
    Humidity,
    /// Barometric pressure (hPa)
    Pressure,
    /// Illuminance (lux)
    Lux,
    /// Clean-air percentage from the gas sensor
    AirQuality,
    /// Time string reported by the node's RTC
    RtcTime,
    /// Monotonic EEPROM record counter
    RecordCount,
    /// RAM in use (bytes)
    RamUsed,
    /// CPU frequency (MHz)
    CpuFreq,
    /// Uptime (seconds)
    UptimeSecs,
    Latitude,
    Longitude,
}

impl Field {
    /// Wire names accepted for this field, in precedence order.
    pub const fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Temperature => &["temp", "temperature"],
            Field::Humidity => &["hum", "humidity"],
            Field::Pressure => &["pres", "pressure"],
            Field::Lux => &["lux"],
            Field::AirQuality => &["air_clean_perc", "air_clean"],
            Field::RtcTime => &["rtc_time"],
            Field::RecordCount => &["eeprom_count"],
            Field::RamUsed => &["ram_used", "g_ram_used"],
            Field::CpuFreq => &["cpu_freq", "g_cpu_freq"],
            Field::UptimeSecs => &["uptime_sec", "g_uptime_sec"],
            Field::Latitude => &["latitude", "lat"],
            Field::Longitude => &["longitude", "lng"],
        }
    }

    /// Unit suffix used by readouts, if any.
    pub const fn unit(self) -> Option<&'static str> {
        match self {
            Field::Temperature => Some("°C"),
            Field::Humidity | Field::AirQuality => Some("%"),
            Field::Pressure => Some("hPa"),
            Field::Lux => Some("lux"),
            Field::RamUsed => Some("B"),
            Field::CpuFreq => Some("MHz"),
            Field::UptimeSecs => Some("s"),
            _ => None,
        }
    }
}

/// Wire names accepted for the capture timestamp, in precedence order.
pub const TIMESTAMP_SYNONYMS: &[&str] = &["timestamp", "time"];

/// A single field value as delivered by a source.
///
/// Values that arrive as strings are kept verbatim so readouts can show them;
/// numeric consumers go through [`FieldValue::as_f64`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a JSON value. `null`, objects and arrays count as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            _ => None,
        }
    }

    /// Numeric view of the value. Unparsable or non-finite values yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}
