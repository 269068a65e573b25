//! Per-view runtime.
//!
//! A [`DashboardView`] is the explicit context object of one dashboard page:
//! it owns the reconciler, the poll schedule and the bus subscription. All
//! events for the view (bus messages, poll completions, timer ticks) are
//! handled on one task, one at a time, so the reconciler never needs a lock.

use crate::config::{MqttConfig, SourceConfig, ViewConfig};
use crate::error::Result;
use crate::input::mqtt::{BusEvent, MqttClient};
use crate::input::poll::Fetcher;
use crate::reconciler::UpdateReconciler;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// How often the displayed sample's staleness is re-evaluated.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Events handled by the view task, in arrival order.
#[derive(Debug)]
pub enum ViewEvent {
    Bus(BusEvent),
    PollCompleted {
        seq: u64,
        bootstrap: bool,
        outcome: Result<Vec<u8>>,
    },
}

impl From<BusEvent> for ViewEvent {
    fn from(event: BusEvent) -> Self {
        ViewEvent::Bus(event)
    }
}

pub struct DashboardView {
    config: ViewConfig,
    reconciler: UpdateReconciler,
    fetcher: Arc<dyn Fetcher>,
}

impl DashboardView {
    pub fn new(config: ViewConfig, reconciler: UpdateReconciler, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            reconciler,
            fetcher,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Start the view, connecting its own MQTT client for push sources.
    pub fn start(self, mqtt: &MqttConfig) -> Result<ViewHandle> {
        let bus = match &self.config.source {
            SourceConfig::Push { channels, .. } => {
                let client_id = format!(
                    "{}-{}-{}",
                    mqtt.client_id,
                    self.config.key,
                    &uuid::Uuid::new_v4().simple().to_string()[..8]
                );
                let mut client = MqttClient::new(mqtt, &client_id);
                for channel in channels {
                    client.subscribe(channel);
                }
                Some(client)
            }
            SourceConfig::Poll { .. } => None,
        };
        self.start_with_bus(bus)
    }

    /// Start the view with an explicit bus client (or none).
    ///
    /// The cache is loaded here, before the first request is dispatched.
    pub fn start_with_bus(mut self, bus: Option<MqttClient>) -> Result<ViewHandle> {
        self.config.validate()?;
        self.reconciler.initialize(Utc::now());

        let (tx, rx) = mpsc::channel::<ViewEvent>(64);
        let cancel = CancellationToken::new();

        let bus_task = bus.map(|client| {
            let tx = tx.clone();
            let token = cancel.child_token();
            tokio::spawn(async move { client.run(tx, token).await })
        });

        info!("[View] Starting '{}' ({:?})", self.config.key, self.config.kind);
        let events = tx.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(tx, rx, token).await });

        Ok(ViewHandle {
            events,
            cancel,
            task,
            bus_task,
        })
    }

    async fn run(
        mut self,
        tx: mpsc::Sender<ViewEvent>,
        mut rx: mpsc::Receiver<ViewEvent>,
        cancel: CancellationToken,
    ) -> UpdateReconciler {
        let mut poll_timer = match self.config.source.clone() {
            SourceConfig::Poll { url, interval_ms } => {
                // First tick fires immediately, matching the initial fetch on page load
                let mut timer = interval(Duration::from_millis(interval_ms));
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some((url, timer))
            }
            SourceConfig::Push { bootstrap_url, .. } => {
                if let Some(url) = bootstrap_url {
                    self.dispatch(&tx, url, true);
                }
                None
            }
        };

        let mut refresh = interval(REFRESH_INTERVAL);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(event) = rx.recv() => self.handle(event),
                url = next_poll(&mut poll_timer) => self.dispatch(&tx, url, false),
                _ = refresh.tick() => {
                    self.reconciler.refresh_connectivity(Utc::now());
                }
            }
        }

        info!("[View] Stopped '{}'", self.config.key);
        self.reconciler
    }

    fn handle(&mut self, event: ViewEvent) {
        let now = Utc::now();
        match event {
            ViewEvent::Bus(BusEvent::Message(msg)) => {
                let outcome = self.reconciler.apply_push(&msg.topic, &msg.payload, now);
                debug!("[View] '{}' push on {}: {:?}", self.config.key, msg.topic, outcome);
            }
            ViewEvent::Bus(BusEvent::ConnectionLost(reason)) => {
                warn!("[View] '{}' bus connection lost: {}", self.config.key, reason);
                self.reconciler.bus_connection_lost(now);
            }
            ViewEvent::PollCompleted {
                seq,
                bootstrap,
                outcome,
            } => {
                let outcome = if bootstrap {
                    self.reconciler.apply_bootstrap(seq, outcome, now)
                } else {
                    self.reconciler.apply_poll(seq, outcome, now)
                };
                debug!("[View] '{}' poll #{}: {:?}", self.config.key, seq, outcome);
            }
        }
    }

    /// Fire-and-forget request; the completion re-enters the event queue.
    fn dispatch(&mut self, tx: &mpsc::Sender<ViewEvent>, url: String, bootstrap: bool) {
        let seq = self.reconciler.begin_poll();
        let fetcher = self.fetcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&url).await;
            if tx
                .send(ViewEvent::PollCompleted {
                    seq,
                    bootstrap,
                    outcome,
                })
                .await
                .is_err()
            {
                debug!("[Poll] View stopped before response #{} arrived", seq);
            }
        });
    }
}

async fn next_poll(timer: &mut Option<(String, Interval)>) -> String {
    match timer {
        Some((url, timer)) => {
            timer.tick().await;
            url.clone()
        }
        None => std::future::pending().await,
    }
}

/// Handle to a running view.
pub struct ViewHandle {
    events: mpsc::Sender<ViewEvent>,
    cancel: CancellationToken,
    task: JoinHandle<UpdateReconciler>,
    bus_task: Option<JoinHandle<()>>,
}

impl ViewHandle {
    /// Sender into the view's event queue, e.g. for an externally owned bus.
    pub fn events(&self) -> mpsc::Sender<ViewEvent> {
        self.events.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel timers and the subscription and hand back the reconciler.
    ///
    /// In-flight requests are not cancelled; their completions are dropped.
    pub async fn stop(self) -> Option<UpdateReconciler> {
        self.cancel.cancel();
        if let Some(bus) = self.bus_task
            && let Err(e) = bus.await
        {
            warn!("[View] Bus task ended abnormally: {}", e);
        }
        match self.task.await {
            Ok(reconciler) => Some(reconciler),
            Err(e) => {
                warn!("[View] View task ended abnormally: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::DashboardError;
    use crate::input::mqtt::BusMessage;
    use crate::presentation::{CanonicalView, ChannelPresenter, PresentationPort};
    use crate::staleness::{ConnectivityState, StalenessEvaluator};
    use crate::store::{MemoryKeyValueStore, PersistenceAdapter};
    use crate::telemetry::Field;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    /// Serves canned bodies in order, then keeps failing.
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Vec<u8>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Err(DashboardError::HttpStatus {
                    status: 503,
                    url: url.to_string(),
                })
            })
        }
    }

    fn build(
        name: &str,
        fetcher: ScriptedFetcher,
    ) -> (DashboardView, UnboundedReceiver<CanonicalView>) {
        let mut config = Config::default().view(name).unwrap().clone();
        if let SourceConfig::Poll { interval_ms, .. } = &mut config.source {
            *interval_ms = 20;
        }
        let (presenter, rx) = ChannelPresenter::new();
        let presenter: Box<dyn PresentationPort> = Box::new(presenter);
        let reconciler = UpdateReconciler::new(
            &config,
            StalenessEvaluator::default(),
            PersistenceAdapter::new(Arc::new(MemoryKeyValueStore::new())),
            presenter,
        );
        (
            DashboardView::new(config, reconciler, Arc::new(fetcher)),
            rx,
        )
    }

    async fn next_view(rx: &mut UnboundedReceiver<CanonicalView>) -> CanonicalView {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for view")
            .expect("presenter closed")
    }

    #[tokio::test]
    async fn test_poll_view_applies_responses_and_survives_failures() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(br#"[{"temp": 20}, {"temp": 19}]"#.to_vec()),
            Err(DashboardError::HttpStatus {
                status: 500,
                url: "x".to_string(),
            }),
            Ok(br#"[{"temp": 21}, {"temp": 20}, {"temp": 19}]"#.to_vec()),
        ]);
        let (view, mut rx) = build("sensors", fetcher);
        let handle = view.start_with_bus(None).unwrap();

        let first = next_view(&mut rx).await;
        assert_eq!(first.series(Field::Temperature), vec![19.0, 20.0]);

        let second = next_view(&mut rx).await;
        assert_eq!(second.series(Field::Temperature), vec![19.0, 20.0, 21.0]);
        assert_eq!(second.connectivity, ConnectivityState::Online);

        let reconciler = handle.stop().await.unwrap();
        assert_eq!(reconciler.store().len(), 3);
    }

    #[tokio::test]
    async fn test_push_view_handles_bus_events() {
        let (view, mut rx) = build("transceiver", ScriptedFetcher::new(vec![]));
        let handle = view.start_with_bus(None).unwrap();
        let events = handle.events();

        events
            .send(ViewEvent::Bus(BusEvent::Message(BusMessage {
                topic: "/weathertech/system_data".to_string(),
                payload: br#"{"ram_used": 150000, "cpu_freq": 240}"#.to_vec(),
            })))
            .await
            .unwrap();
        let live = next_view(&mut rx).await;
        assert_eq!(live.connectivity, ConnectivityState::Online);

        events
            .send(ViewEvent::Bus(BusEvent::ConnectionLost("eof".to_string())))
            .await
            .unwrap();
        let lost = next_view(&mut rx).await;
        assert_eq!(lost.connectivity, ConnectivityState::Offline);
        assert_eq!(lost.latest.number(Field::CpuFreq), Some(240.0));

        assert!(handle.is_running());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_overview_bootstraps_from_history() {
        let fetcher = ScriptedFetcher::new(vec![Ok(
            br#"[{"eeprom_count": 1500, "timestamp": "2025-01-10T11:00:00Z"}]"#.to_vec(),
        )]);
        let (view, mut rx) = build("overview", fetcher);
        let handle = view.start_with_bus(None).unwrap();

        let boot = next_view(&mut rx).await;
        assert_eq!(boot.latest.number(Field::RecordCount), Some(1500.0));

        let reconciler = handle.stop().await.unwrap();
        assert_eq!(reconciler.last_applied_seq(), Some(1));
    }

    #[tokio::test]
    async fn test_invalid_config_does_not_start() {
        let (mut view, _rx) = build("gateway", ScriptedFetcher::new(vec![]));
        view.config.capacity = 0;
        assert!(view.start_with_bus(None).is_err());
    }
}
