//! Headless presenter that renders canonical views as log lines.

use super::format::{
    AirQuality, Axis, GatewayMemory, TransceiverHealth, format_reading, to_dms,
};
use super::{CanonicalView, PresentationPort};
use crate::staleness::ConnectivityState;
use crate::telemetry::Field;
use log::{info, warn};
use strum::IntoEnumIterator;

#[derive(Debug, Default)]
pub struct LogPresenter {
    last_connectivity: Option<ConnectivityState>,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line summary of every populated field.
    pub fn summary(view: &CanonicalView) -> String {
        let readings: Vec<String> = Field::iter()
            .filter_map(|field| format_reading(&view.latest, field).map(|r| format!("{}={}", field, r)))
            .collect();
        format!(
            "[{}] {} ({}) {} | history={}",
            view.view_key,
            view.connectivity,
            view.provenance,
            readings.join(" "),
            view.history.len()
        )
    }
}

impl PresentationPort for LogPresenter {
    fn present(&mut self, view: &CanonicalView) {
        if self.last_connectivity != Some(view.connectivity) {
            match view.connectivity {
                ConnectivityState::Online => info!("[{}] Connectivity: Online", view.view_key),
                state => warn!("[{}] Connectivity: {}", view.view_key, state),
            }
            self.last_connectivity = Some(view.connectivity);
        }

        info!("{}", Self::summary(view));

        let latest = &view.latest;
        if let Some(air) = latest.number(Field::AirQuality) {
            info!("[{}]   air: {}", view.view_key, AirQuality::from_percent(air));
        }
        if let Some(health) = TransceiverHealth::from_sample(latest) {
            info!(
                "[{}]   health: {:.0} (ram {:.0}%, cpu {:.0}%)",
                view.view_key, health.score, health.ram_percent, health.cpu_percent
            );
        } else if let Some(mem) = GatewayMemory::from_sample(latest) {
            info!(
                "[{}]   memory: {:.0} KB used, {:.0} KB free",
                view.view_key, mem.used_kb, mem.free_kb
            );
        }
        if let Some(point) = latest.coordinate() {
            info!(
                "[{}]   position: {} {}",
                view.view_key,
                to_dms(point.lat, Axis::Latitude),
                to_dms(point.lng, Axis::Longitude)
            );
        }
        for field in [Field::Temperature, Field::Humidity] {
            if let Some((lo, hi)) = view.range(field) {
                info!("[{}]   {} min/max: {:.1}/{:.1}", view.view_key, field, lo, hi);
            }
        }
    }
}
