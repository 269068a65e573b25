//! Readout formatting shared by the dashboard renderers.

use crate::telemetry::{Field, Sample};
use strum::Display;

/// Transceiver and gateway boards ship with 320 KB of RAM.
pub const TOTAL_RAM_KB: f64 = 320.0;

/// Maximum CPU clock of the transceiver (MHz).
pub const MAX_CPU_MHZ: f64 = 240.0;

/// Air is graded clean above this percentage.
pub const CLEAN_AIR_THRESHOLD: f64 = 70.0;

/// `"{d}d {h}h {m}m"`, leaving out zero days and hours.
pub fn format_uptime(seconds: u64) -> String {
    let d = seconds / 86_400;
    let h = (seconds % 86_400) / 3_600;
    let m = (seconds % 3_600) / 60;

    let mut out = String::new();
    if d > 0 {
        out.push_str(&format!("{}d ", d));
    }
    if h > 0 {
        out.push_str(&format!("{}h ", h));
    }
    out.push_str(&format!("{}m", m));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

/// Decimal degrees to degrees/minutes/seconds with hemisphere.
pub fn to_dms(deg: f64, axis: Axis) -> String {
    let abs = deg.abs();
    let d = abs.floor();
    let min_float = (abs - d) * 60.0;
    let m = min_float.floor();
    let s = ((min_float - m) * 60.0).round();

    let dir = match (axis, deg < 0.0) {
        (Axis::Latitude, true) => "S",
        (Axis::Latitude, false) => "N",
        (Axis::Longitude, true) => "W",
        (Axis::Longitude, false) => "E",
    };
    format!("{}° {}' {}\" {}", d as u64, m as u64, s as u64, dir)
}

/// Air-quality badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AirQuality {
    Clean,
    Moderate,
}

impl AirQuality {
    pub fn from_percent(percent: f64) -> Self {
        if percent > CLEAN_AIR_THRESHOLD {
            AirQuality::Clean
        } else {
            AirQuality::Moderate
        }
    }
}

/// Resource usage and health score of the transceiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransceiverHealth {
    pub ram_used_kb: f64,
    pub ram_percent: f64,
    pub cpu_percent: f64,
    /// 100 minus a quarter of the combined RAM and CPU load
    pub score: f64,
}

impl TransceiverHealth {
    pub fn from_sample(sample: &Sample) -> Option<Self> {
        let ram_used_kb = (sample.number(Field::RamUsed)? / 1024.0).round();
        let cpu_mhz = sample.number(Field::CpuFreq)?;
        let ram_percent = (ram_used_kb / TOTAL_RAM_KB * 100.0).min(100.0);
        let cpu_percent = (cpu_mhz / MAX_CPU_MHZ * 100.0).min(100.0);
        Some(Self {
            ram_used_kb,
            ram_percent,
            cpu_percent,
            score: 100.0 - (ram_percent + cpu_percent) / 4.0,
        })
    }
}

/// Gateway memory doughnut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatewayMemory {
    pub used_kb: f64,
    pub free_kb: f64,
}

impl GatewayMemory {
    pub fn from_sample(sample: &Sample) -> Option<Self> {
        let used_kb = (sample.number(Field::RamUsed)? / 1024.0).round();
        Some(Self {
            used_kb,
            free_kb: TOTAL_RAM_KB - used_kb,
        })
    }
}

/// Readout text for a field, e.g. `"21.5 °C"`. Text that fails to parse is
/// shown verbatim.
pub fn format_reading(sample: &Sample, field: Field) -> Option<String> {
    let value = sample.get(field)?;
    let Some(n) = value.as_f64() else {
        return Some(value.to_string());
    };
    let text = match field {
        Field::Temperature | Field::Humidity | Field::Pressure => format!("{:.1}", n),
        Field::Latitude | Field::Longitude => format!("{:.6}", n),
        Field::UptimeSecs => return Some(format_uptime(n.max(0.0) as u64)),
        _ => format!("{:.0}", n),
    };
    Some(match field.unit() {
        Some(unit) => format!("{} {}", text, unit),
        None => text,
    })
}
