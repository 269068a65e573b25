//! Live-data reconciliation for one dashboard view.
//!
//! The reconciler merges three things: the cached last-known state loaded at
//! startup, the live update stream (bus messages and poll responses), and a
//! fixed-capacity rolling history. After every applied update it writes the
//! new state through to the cache and hands a [`CanonicalView`] to the
//! presentation port.
//!
//! It is deliberately synchronous. The view runtime owns it on a single task
//! and feeds it events one at a time, so no locking is needed.
//!
//! ## Overlapping polls
//!
//! Poll requests are fire-and-forget and a slow response can arrive after a
//! newer one. Each request is tagged with a sequence number at dispatch
//! ([`UpdateReconciler::begin_poll`]). By default
//! ([`PollOrdering::ArrivalOrder`]) responses are applied as they arrive and
//! the last one applied wins. Views opting into
//! [`PollOrdering::LatestDispatched`] discard a response older than the last
//! applied one.

use crate::config::{SourceConfig, ViewConfig};
use crate::error::{DashboardError, Result};
use crate::input::mqtt::topic_matches;
use crate::presentation::{CanonicalView, PresentationPort, Provenance};
use crate::staleness::{ConnectivityState, StalenessEvaluator};
use crate::store::{CachedViewState, PersistenceAdapter, SampleStore};
use crate::telemetry::{Field, Payload, Sample};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{EnumString, IntoEnumIterator};

/// How overlapping poll responses are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PollOrdering {
    /// Apply in arrival order, last applied wins
    #[default]
    #[strum(serialize = "arrival")]
    ArrivalOrder,
    /// Discard responses dispatched before the last applied one
    #[strum(serialize = "latest")]
    LatestDispatched,
}

/// Result of feeding one event to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Store mutated, cache written, view presented
    Applied(ConnectivityState),
    /// Poll response older than one already applied
    Superseded,
    /// Not for this view (foreign channel, no GPS fix, empty batch)
    Ignored,
    /// Transport or payload failure; the store is untouched
    Failed,
}

pub struct UpdateReconciler {
    view_key: String,
    store: SampleStore,
    displayed: Option<Sample>,
    provenance: Provenance,
    connectivity: Option<ConnectivityState>,
    /// Reference time of the last live update (arrival for push, capture for poll)
    live_at: Option<DateTime<Utc>>,
    bus_down: bool,
    channels: Vec<String>,
    display_limit: Option<usize>,
    persist_history: bool,
    require_coordinate: bool,
    poll_ordering: PollOrdering,
    next_seq: u64,
    last_applied_seq: Option<u64>,
    initialized: bool,
    staleness: StalenessEvaluator,
    persistence: PersistenceAdapter,
    presenter: Box<dyn PresentationPort>,
}

impl UpdateReconciler {
    pub fn new(
        config: &ViewConfig,
        staleness: StalenessEvaluator,
        persistence: PersistenceAdapter,
        presenter: Box<dyn PresentationPort>,
    ) -> Self {
        let channels = match &config.source {
            SourceConfig::Push { channels, .. } => channels.clone(),
            SourceConfig::Poll { .. } => Vec::new(),
        };
        Self {
            view_key: config.key.clone(),
            store: SampleStore::new(config.capacity),
            displayed: None,
            provenance: Provenance::LastKnown,
            connectivity: None,
            live_at: None,
            bus_down: false,
            channels,
            display_limit: config.display_limit,
            persist_history: config.persist_history,
            require_coordinate: config.require_coordinate,
            poll_ordering: config.poll_ordering,
            next_seq: 0,
            last_applied_seq: None,
            initialized: false,
            staleness,
            persistence,
            presenter,
        }
    }

    pub fn view_key(&self) -> &str {
        &self.view_key
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Sample currently on display, merged across partial updates.
    pub fn displayed(&self) -> Option<&Sample> {
        self.displayed.as_ref()
    }

    pub fn connectivity(&self) -> Option<ConnectivityState> {
        self.connectivity
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn last_applied_seq(&self) -> Option<u64> {
        self.last_applied_seq
    }

    /// Restore the cached state and present it as "last known".
    ///
    /// Only the first call reads the cache; later calls are no-ops.
    pub fn initialize(&mut self, now: DateTime<Utc>) -> Option<ConnectivityState> {
        if self.initialized {
            return None;
        }
        self.initialized = true;

        let cached = self.persistence.load(&self.view_key)?;
        self.store.restore(cached.history);
        let state = self.staleness.classify(cached.latest.timestamp, now);
        self.displayed = Some(cached.latest);
        self.provenance = Provenance::LastKnown;
        self.connectivity = Some(state);
        info!(
            "[View] '{}' showing last known state ({})",
            self.view_key, state
        );
        self.present();
        Some(state)
    }

    /// Whether a bus channel feeds this view.
    pub fn accepts(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|f| topic_matches(f, channel))
    }

    /// Apply one bus message. Push implies live arrival.
    pub fn apply_push(&mut self, channel: &str, payload: &[u8], now: DateTime<Utc>) -> UpdateOutcome {
        if !self.accepts(channel) {
            debug!("[View] '{}' ignoring message on {}", self.view_key, channel);
            return UpdateOutcome::Ignored;
        }
        match Payload::parse(payload, now) {
            Ok(payload) => {
                self.bus_down = false;
                self.apply_payload(payload, now, true)
            }
            Err(e) => {
                warn!(
                    "[MQTT] '{}' discarding message on {}: {}",
                    self.view_key, channel, e
                );
                UpdateOutcome::Failed
            }
        }
    }

    /// Tag a new poll request. Sequence numbers are strictly increasing.
    pub fn begin_poll(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Apply the outcome of poll request `seq`.
    pub fn apply_poll(&mut self, seq: u64, outcome: Result<Vec<u8>>, now: DateTime<Utc>) -> UpdateOutcome {
        if self.poll_ordering == PollOrdering::LatestDispatched
            && let Some(last) = self.last_applied_seq
            && seq <= last
        {
            debug!(
                "[Poll] '{}' discarding response #{} (already applied #{})",
                self.view_key, seq, last
            );
            return UpdateOutcome::Superseded;
        }

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                if e.is_transport() {
                    warn!("[Poll] '{}' request #{} failed: {}", self.view_key, seq, e);
                } else {
                    error!("[Poll] '{}' request #{} errored: {}", self.view_key, seq, e);
                }
                self.refresh_connectivity(now);
                return UpdateOutcome::Failed;
            }
        };

        let payload = match Payload::parse(&body, now) {
            Ok(payload) => payload,
            Err(DashboardError::EmptyPayload) => {
                warn!("[Poll] '{}' backend returned no rows", self.view_key);
                return UpdateOutcome::Ignored;
            }
            Err(e) => {
                warn!("[Poll] '{}' discarding response #{}: {}", self.view_key, seq, e);
                return UpdateOutcome::Failed;
            }
        };

        let outcome = self.apply_payload(payload, now, false);
        if matches!(outcome, UpdateOutcome::Applied(_)) {
            self.last_applied_seq = Some(self.last_applied_seq.map_or(seq, |last| last.max(seq)));
        }
        outcome
    }

    /// Apply a one-shot bootstrap fetch. Dropped once live data has arrived.
    pub fn apply_bootstrap(&mut self, seq: u64, outcome: Result<Vec<u8>>, now: DateTime<Utc>) -> UpdateOutcome {
        if self.provenance == Provenance::Live {
            debug!("[Poll] '{}' live data already shown, skipping bootstrap", self.view_key);
            return UpdateOutcome::Superseded;
        }
        self.apply_poll(seq, outcome, now)
    }

    /// Re-evaluate staleness of the displayed sample.
    ///
    /// Presents only when the connectivity state actually changed.
    pub fn refresh_connectivity(&mut self, now: DateTime<Utc>) -> Option<ConnectivityState> {
        let displayed = self.displayed.as_ref()?;
        let state = if self.bus_down {
            ConnectivityState::Offline
        } else {
            let reference = self.live_at.unwrap_or(displayed.timestamp);
            self.staleness.classify(reference, now)
        };
        if self.connectivity == Some(state) {
            return None;
        }
        info!(
            "[View] '{}' connectivity {} -> {}",
            self.view_key,
            self.connectivity
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            state
        );
        self.connectivity = Some(state);
        self.present();
        Some(state)
    }

    /// The bus dropped; show Offline until the next applied update.
    pub fn bus_connection_lost(&mut self, now: DateTime<Utc>) -> Option<ConnectivityState> {
        self.bus_down = true;
        self.refresh_connectivity(now)
    }

    /// Current canonical view, if anything is on display.
    pub fn canonical_view(&self) -> Option<CanonicalView> {
        let latest = self.displayed.clone()?;
        let ranges: BTreeMap<Field, (f64, f64)> = Field::iter()
            .filter_map(|f| self.store.min_max(f).map(|r| (f, r)))
            .collect();
        Some(CanonicalView {
            view_key: self.view_key.clone(),
            latest,
            history: self.store.to_vec(),
            connectivity: self.connectivity.unwrap_or(ConnectivityState::Offline),
            provenance: self.provenance,
            ranges,
        })
    }

    fn apply_payload(&mut self, payload: Payload, now: DateTime<Utc>, pushed: bool) -> UpdateOutcome {
        let latest = match payload {
            Payload::Single(mut sample) => {
                if !self.admit(&mut sample) {
                    return UpdateOutcome::Ignored;
                }
                self.store.append(sample.clone());
                sample
            }
            Payload::Batch(samples) => {
                let samples: Vec<Sample> = samples
                    .into_iter()
                    .filter_map(|mut s| self.admit(&mut s).then_some(s))
                    .collect();
                let Some(latest) = samples.first().cloned() else {
                    return UpdateOutcome::Ignored;
                };
                self.store.replace_all(samples, self.display_limit);
                latest
            }
        };

        let reference = if pushed { now } else { latest.timestamp };
        match self.displayed.as_mut() {
            Some(shown) => shown.merge_from(&latest),
            None => self.displayed = Some(latest),
        }

        let state = self.staleness.classify(reference, now);
        self.live_at = Some(reference);
        self.connectivity = Some(state);
        self.provenance = Provenance::Live;

        self.persist(now);
        self.present();
        UpdateOutcome::Applied(state)
    }

    /// GPS views only take samples with a real fix.
    fn admit(&self, sample: &mut Sample) -> bool {
        if !self.require_coordinate {
            return true;
        }
        sample.drop_unfixed_coordinate();
        sample.coordinate().is_some()
    }

    fn persist(&self, now: DateTime<Utc>) {
        let Some(latest) = self.displayed.clone() else {
            return;
        };
        let state = CachedViewState {
            latest,
            history: if self.persist_history {
                self.store.to_vec()
            } else {
                Vec::new()
            },
            saved_at: now,
        };
        if let Err(e) = self.persistence.save(&self.view_key, &state) {
            error!("[Cache] Failed to save '{}': {}", self.view_key, e);
        }
    }

    fn present(&mut self) {
        if let Some(view) = self.canonical_view() {
            self.presenter.present(&view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ViewConfig};
    use crate::presentation::ChannelPresenter;
    use crate::store::{KeyValueStore, MemoryKeyValueStore};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn view_config(name: &str) -> ViewConfig {
        Config::default().view(name).unwrap().clone()
    }

    fn reconciler(
        config: &ViewConfig,
        store: Arc<MemoryKeyValueStore>,
    ) -> (UpdateReconciler, UnboundedReceiver<CanonicalView>) {
        let (presenter, rx) = ChannelPresenter::new();
        let reconciler = UpdateReconciler::new(
            config,
            StalenessEvaluator::default(),
            PersistenceAdapter::new(store),
            Box::new(presenter),
        );
        (reconciler, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<CanonicalView>) -> Vec<CanonicalView> {
        let mut out = Vec::new();
        while let Ok(v) = rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_partial_push_keeps_previous_fields() {
        let config = view_config("transceiver");
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let topic = Config::default().topics.system;

        rec.apply_push(&topic, br#"{"temp": 22.5, "hum": 60}"#, now());
        let outcome = rec.apply_push(&topic, br#"{"temp": 23.0}"#, now());

        assert_eq!(outcome, UpdateOutcome::Applied(ConnectivityState::Online));
        let shown = rec.displayed().unwrap();
        assert_eq!(shown.number(Field::Temperature), Some(23.0));
        assert_eq!(shown.number(Field::Humidity), Some(60.0));

        let views = drain(&mut rx);
        assert_eq!(views.len(), 2);
        assert_eq!(views[1].latest.number(Field::Humidity), Some(60.0));
        assert_eq!(views[1].history.len(), 2);
        assert_eq!(views[1].provenance, Provenance::Live);
    }

    #[test]
    fn test_push_on_foreign_channel_is_ignored() {
        let config = view_config("transceiver");
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let outcome = rec.apply_push("/weathertech/gateway_system", br#"{"temp": 1}"#, now());
        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_malformed_push_is_discarded() {
        let config = view_config("overview");
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        rec.apply_push("/weathertech/sensor_data", br#"{"eeprom_count": 10}"#, now());
        let outcome = rec.apply_push("/weathertech/sensor_data", b"not json", now());

        assert_eq!(outcome, UpdateOutcome::Failed);
        assert_eq!(rec.store().len(), 1);
        assert_eq!(rec.displayed().unwrap().number(Field::RecordCount), Some(10.0));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_overview_merges_sensor_and_gateway_channels() {
        let config = view_config("overview");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        rec.apply_push("/weathertech/sensor_data", br#"{"eeprom_count": 1200}"#, now());
        rec.apply_push("/weathertech/gateway_system", br#"{"g_uptime_sec": 7200}"#, now());

        let shown = rec.displayed().unwrap();
        assert_eq!(shown.number(Field::RecordCount), Some(1200.0));
        assert_eq!(shown.number(Field::UptimeSecs), Some(7200.0));
    }

    #[test]
    fn test_poll_batch_builds_chronological_history() {
        let config = view_config("sensors");
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let body = br#"[
            {"temp": 21, "timestamp": "2025-01-10T11:59:50Z"},
            {"temp": 20, "timestamp": "2025-01-10T11:59:46Z"},
            {"temp": 19, "timestamp": "2025-01-10T11:59:42Z"}
        ]"#;

        let seq = rec.begin_poll();
        let outcome = rec.apply_poll(seq, Ok(body.to_vec()), now());

        assert_eq!(outcome, UpdateOutcome::Applied(ConnectivityState::Online));
        let temps: Vec<f64> = rec.store().iter().filter_map(|s| s.number(Field::Temperature)).collect();
        assert_eq!(temps, vec![19.0, 20.0, 21.0]);
        let shown = rec.displayed().unwrap();
        assert_eq!(shown.number(Field::Temperature), Some(21.0));
        assert_eq!(shown.timestamp, Utc.with_ymd_and_hms(2025, 1, 10, 11, 59, 50).unwrap());

        let views = drain(&mut rx);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].range(Field::Temperature), Some((19.0, 21.0)));
    }

    #[test]
    fn test_display_limit_trims_batch_history() {
        let mut config = view_config("sensors");
        config.display_limit = Some(3);
        assert_eq!(config.capacity, 50);
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));

        let rows: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"temp": {}, "timestamp": "2025-01-10T11:59:{:02}Z"}}"#, 30 - i, 50 - i))
            .collect();
        let body = format!("[{}]", rows.join(","));

        let seq = rec.begin_poll();
        assert!(matches!(
            rec.apply_poll(seq, Ok(body.into_bytes()), now()),
            UpdateOutcome::Applied(_)
        ));
        let temps: Vec<f64> = rec.store().iter().filter_map(|s| s.number(Field::Temperature)).collect();
        assert_eq!(temps, vec![28.0, 29.0, 30.0]);
        assert_eq!(rec.displayed().unwrap().number(Field::Temperature), Some(30.0));
        assert_eq!(
            rec.displayed().unwrap().timestamp,
            Utc.with_ymd_and_hms(2025, 1, 10, 11, 59, 50).unwrap()
        );
    }

    #[test]
    fn test_stalled_backend_classifies_offline() {
        let config = view_config("gateway");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let seq = rec.begin_poll();
        let outcome = rec.apply_poll(
            seq,
            Ok(br#"{"g_cpu_freq": 160, "timestamp": "2025-01-10T11:58:00Z"}"#.to_vec()),
            now(),
        );
        assert_eq!(outcome, UpdateOutcome::Applied(ConnectivityState::Offline));
    }

    #[test]
    fn test_superseded_poll_is_discarded() {
        let mut config = view_config("gateway");
        config.poll_ordering = PollOrdering::LatestDispatched;
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let slow = rec.begin_poll();
        let fast = rec.begin_poll();

        rec.apply_poll(fast, Ok(br#"{"g_cpu_freq": 240}"#.to_vec()), now());
        let outcome = rec.apply_poll(slow, Ok(br#"{"g_cpu_freq": 80}"#.to_vec()), now());

        assert_eq!(outcome, UpdateOutcome::Superseded);
        assert_eq!(rec.displayed().unwrap().number(Field::CpuFreq), Some(240.0));
        assert_eq!(rec.last_applied_seq(), Some(fast));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_default_view_applies_late_response() {
        let config = view_config("gateway");
        assert_eq!(config.poll_ordering, PollOrdering::ArrivalOrder);
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let slow = rec.begin_poll();
        let fast = rec.begin_poll();

        rec.apply_poll(fast, Ok(br#"{"g_cpu_freq": 240}"#.to_vec()), now());
        let outcome = rec.apply_poll(slow, Ok(br#"{"g_cpu_freq": 80}"#.to_vec()), now());

        assert!(matches!(outcome, UpdateOutcome::Applied(_)));
        assert_eq!(rec.displayed().unwrap().number(Field::CpuFreq), Some(80.0));
    }

    #[test]
    fn test_failed_poll_leaves_store_untouched() {
        let config = view_config("sensors");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let seq = rec.begin_poll();
        rec.apply_poll(seq, Ok(br#"[{"temp": 21}]"#.to_vec()), now());

        let seq = rec.begin_poll();
        let outcome = rec.apply_poll(
            seq,
            Err(DashboardError::HttpStatus {
                status: 502,
                url: "http://backend/api/latest/sensor".to_string(),
            }),
            now(),
        );
        assert_eq!(outcome, UpdateOutcome::Failed);
        assert_eq!(rec.store().len(), 1);

        let seq = rec.begin_poll();
        assert_eq!(rec.apply_poll(seq, Ok(b"[]".to_vec()), now()), UpdateOutcome::Ignored);
        assert_eq!(rec.store().len(), 1);
    }

    #[test]
    fn test_every_applied_update_is_persisted() {
        let config = view_config("transceiver");
        let store = Arc::new(MemoryKeyValueStore::new());
        let (mut rec, _rx) = reconciler(&config, store.clone());
        rec.apply_push("/weathertech/system_data", br#"{"ram_used": 120000, "cpu_freq": 240}"#, now());

        let raw = store.get("weathertech_transceiver").unwrap().unwrap();
        let cached: CachedViewState = serde_json::from_str(&raw).unwrap();
        assert_eq!(cached.latest.number(Field::CpuFreq), Some(240.0));
        assert_eq!(cached.history.len(), 1);
    }

    #[test]
    fn test_gateway_caches_latest_only() {
        let config = view_config("gateway");
        let store = Arc::new(MemoryKeyValueStore::new());
        let (mut rec, _rx) = reconciler(&config, store.clone());
        let seq = rec.begin_poll();
        rec.apply_poll(seq, Ok(br#"{"g_ram_used": 204800}"#.to_vec()), now());

        let raw = store.get("weathertech_gateway").unwrap().unwrap();
        let cached: CachedViewState = serde_json::from_str(&raw).unwrap();
        assert!(cached.history.is_empty());
    }

    #[test]
    fn test_initialize_presents_last_known_state_once() {
        let config = view_config("transceiver");
        let store = Arc::new(MemoryKeyValueStore::new());
        {
            let (mut rec, _rx) = reconciler(&config, store.clone());
            rec.apply_push("/weathertech/system_data", br#"{"cpu_freq": 160}"#, now());
        }

        let (mut rec, mut rx) = reconciler(&config, store);
        let later = now() + Duration::minutes(10);
        assert_eq!(rec.initialize(later), Some(ConnectivityState::Offline));
        assert_eq!(rec.initialize(later), None);

        let views = drain(&mut rx);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].provenance, Provenance::LastKnown);
        assert_eq!(views[0].latest.number(Field::CpuFreq), Some(160.0));
        assert_eq!(rec.store().len(), 1);
    }

    #[test]
    fn test_initialize_with_corrupt_cache_starts_empty() {
        let config = view_config("gps");
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set("weathertech_gps", "][").unwrap();
        let (mut rec, mut rx) = reconciler(&config, store);
        assert_eq!(rec.initialize(now()), None);
        assert!(rec.displayed().is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_gps_requires_fix() {
        let config = view_config("gps");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let topic = "/weathertech/system_data";

        assert_eq!(
            rec.apply_push(topic, br#"{"latitude": 0.0, "longitude": 0.0, "cpu_freq": 240}"#, now()),
            UpdateOutcome::Ignored
        );
        assert_eq!(
            rec.apply_push(topic, br#"{"cpu_freq": 240}"#, now()),
            UpdateOutcome::Ignored
        );
        assert!(matches!(
            rec.apply_push(topic, br#"{"latitude": "-8.178842", "longitude": "113.72617"}"#, now()),
            UpdateOutcome::Applied(_)
        ));
        assert_eq!(rec.store().len(), 1);
    }

    #[test]
    fn test_refresh_flips_to_offline_once() {
        let config = view_config("transceiver");
        let (mut rec, mut rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        rec.apply_push("/weathertech/system_data", br#"{"cpu_freq": 240}"#, now());

        assert_eq!(rec.refresh_connectivity(now() + Duration::seconds(30)), None);
        assert_eq!(
            rec.refresh_connectivity(now() + Duration::seconds(61)),
            Some(ConnectivityState::Offline)
        );
        assert_eq!(rec.refresh_connectivity(now() + Duration::seconds(90)), None);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn test_bus_loss_forces_offline_until_next_message() {
        let config = view_config("transceiver");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let topic = "/weathertech/system_data";
        rec.apply_push(topic, br#"{"cpu_freq": 240}"#, now());

        assert_eq!(rec.bus_connection_lost(now()), Some(ConnectivityState::Offline));
        assert_eq!(
            rec.apply_push(topic, br#"{"cpu_freq": 160}"#, now()),
            UpdateOutcome::Applied(ConnectivityState::Online)
        );
        assert_eq!(rec.refresh_connectivity(now()), None);
    }

    #[test]
    fn test_bootstrap_skipped_after_live_data() {
        let config = view_config("overview");
        let (mut rec, _rx) = reconciler(&config, Arc::new(MemoryKeyValueStore::new()));
        let seq = rec.begin_poll();
        rec.apply_push("/weathertech/sensor_data", br#"{"eeprom_count": 1300}"#, now());

        let outcome = rec.apply_bootstrap(seq, Ok(br#"[{"eeprom_count": 1299}]"#.to_vec()), now());
        assert_eq!(outcome, UpdateOutcome::Superseded);
        assert_eq!(rec.displayed().unwrap().number(Field::RecordCount), Some(1300.0));
    }
}
