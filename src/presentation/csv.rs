//! CSV flattening of a sample history for export.

use crate::telemetry::{Field, Sample};
use chrono::SecondsFormat;

pub const CSV_HEADER: &str = "Timestamp,RTC,Temp,Hum,Pres,Lux,Air";

const COLUMNS: [Field; 6] = [
    Field::RtcTime,
    Field::Temperature,
    Field::Humidity,
    Field::Pressure,
    Field::Lux,
    Field::AirQuality,
];

/// One row per sample, fixed column order. Missing values are left empty.
pub fn to_csv<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for sample in samples {
        out.push_str(&sample.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
        for field in COLUMNS {
            out.push(',');
            if let Some(value) = sample.get(field) {
                out.push_str(&escape(&value.to_string()));
            }
        }
        out.push('\n');
    }
    out
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
