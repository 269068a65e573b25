use crate::error::{DashboardError, Result};
use crate::reconciler::PollOrdering;
use crate::staleness::StalenessEvaluator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = &value[1..value.len() - 1];
            }

            // Only set if not already set (env vars take precedence)
            if std::env::var(key).is_err() {
                // SAFETY: We're single-threaded at this point (called before any async runtime)
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub topics: TopicConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub staleness: StalenessConfig,
    pub views: Vec<ViewConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Wildcard filter covering every WeatherTech topic (overview page)
    pub all: String,
    pub sensor: String,
    pub system: String,
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub history: String,
    pub latest_sensor: String,
    pub latest_sensor_system: String,
    pub latest_gateway_system: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for cached view state. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("weathertech-dashboard"))
            .unwrap_or_else(|| PathBuf::from(".weathertech-dashboard"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    /// Start of the warning band. `None` keeps the two-state Online/Offline model.
    pub stale_after_secs: Option<u64>,
    pub offline_after_secs: u64,
}

impl StalenessConfig {
    pub fn evaluator(&self) -> StalenessEvaluator {
        match self.stale_after_secs {
            Some(stale) => StalenessEvaluator::with_warning_band(
                Duration::from_secs(stale),
                Duration::from_secs(self.offline_after_secs),
            ),
            None => StalenessEvaluator::new(Duration::from_secs(self.offline_after_secs)),
        }
    }
}

/// The dashboard pages of the WeatherTech site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ViewKind {
    Sensors,
    Gateway,
    Transceiver,
    Overview,
    Gps,
}

/// Where a view gets its live data from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceConfig {
    /// Message-bus subscription. `bootstrap_url` is fetched once at start.
    Push {
        channels: Vec<String>,
        bootstrap_url: Option<String>,
    },
    /// Fixed-interval polling of a REST endpoint.
    Poll { url: String, interval_ms: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub kind: ViewKind,
    /// Namespace for the persisted cache entry.
    pub key: String,
    pub source: SourceConfig,
    pub capacity: usize,
    /// Number of points kept from a batch response; `None` keeps `capacity`.
    pub display_limit: Option<usize>,
    /// Persist the rolling history alongside the latest sample.
    pub persist_history: bool,
    /// Drop samples without a usable coordinate (GPS track).
    pub require_coordinate: bool,
    pub poll_ordering: PollOrdering,
}

impl ViewConfig {
    pub fn for_kind(kind: ViewKind, topics: &TopicConfig, api: &ApiConfig) -> Self {
        let (source, capacity, persist_history) = match kind {
            ViewKind::Sensors => (
                SourceConfig::Poll {
                    url: api.latest_sensor.clone(),
                    interval_ms: 4000,
                },
                50,
                true,
            ),
            ViewKind::Gateway => (
                SourceConfig::Poll {
                    url: api.latest_gateway_system.clone(),
                    interval_ms: 3000,
                },
                10,
                false,
            ),
            ViewKind::Transceiver => (
                SourceConfig::Push {
                    channels: vec![topics.system.clone()],
                    bootstrap_url: None,
                },
                50,
                true,
            ),
            ViewKind::Overview => (
                SourceConfig::Push {
                    channels: vec![topics.all.clone()],
                    bootstrap_url: Some(api.history.clone()),
                },
                10,
                false,
            ),
            ViewKind::Gps => (
                SourceConfig::Push {
                    channels: vec![topics.system.clone(), topics.sensor.clone()],
                    bootstrap_url: None,
                },
                50,
                true,
            ),
        };

        Self {
            kind,
            key: kind.to_string(),
            source,
            capacity,
            display_limit: None,
            persist_history,
            require_coordinate: kind == ViewKind::Gps,
            poll_ordering: PollOrdering::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(DashboardError::InvalidConfig(format!(
                "view '{}' has zero capacity",
                self.key
            )));
        }
        match &self.source {
            SourceConfig::Poll { url, interval_ms } => {
                if url.is_empty() {
                    return Err(DashboardError::InvalidConfig(format!(
                        "view '{}' has no poll URL",
                        self.key
                    )));
                }
                if *interval_ms == 0 {
                    return Err(DashboardError::InvalidConfig(format!(
                        "view '{}' has zero poll interval",
                        self.key
                    )));
                }
            }
            SourceConfig::Push { channels, .. } => {
                if channels.is_empty() {
                    return Err(DashboardError::InvalidConfig(format!(
                        "view '{}' subscribes to no channels",
                        self.key
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let topics = TopicConfig {
            all: "/weathertech/#".to_string(),
            sensor: "/weathertech/sensor_data".to_string(),
            system: "/weathertech/system_data".to_string(),
            gateway: "/weathertech/gateway_system".to_string(),
        };
        let api = ApiConfig {
            history: "http://localhost:8080/api/history".to_string(),
            latest_sensor: "http://localhost:8080/api/latest/sensor".to_string(),
            latest_sensor_system: "http://localhost:8080/api/latest/sensor_system".to_string(),
            latest_gateway_system: "http://localhost:8080/api/latest/gateway_system".to_string(),
        };
        let views = ViewKind::iter()
            .map(|kind| ViewConfig::for_kind(kind, &topics, &api))
            .collect();

        Self {
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 8883,
                client_id: "weathertech-dashboard".to_string(),
                username: None,
                password: None,
                use_tls: true,
            },
            topics,
            api,
            storage: StorageConfig { data_dir: None },
            staleness: StalenessConfig {
                stale_after_secs: None,
                offline_after_secs: 60,
            },
            views,
        }
    }
}

fn env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Ok(tls) = std::env::var("MQTT_USE_TLS")
            && let Some(flag) = env_flag(&tls)
        {
            config.mqtt.use_tls = flag;
        }

        // Topics
        if let Ok(topic) = std::env::var("TOPIC_ALL") {
            config.topics.all = topic;
        }
        if let Ok(topic) = std::env::var("TOPIC_SENSOR") {
            config.topics.sensor = topic;
        }
        if let Ok(topic) = std::env::var("TOPIC_SYSTEM") {
            config.topics.system = topic;
        }
        if let Ok(topic) = std::env::var("TOPIC_GATEWAY") {
            config.topics.gateway = topic;
        }

        // REST backend
        if let Ok(url) = std::env::var("API_HISTORY") {
            config.api.history = url;
        }
        if let Ok(url) = std::env::var("API_LATEST_SENSOR") {
            config.api.latest_sensor = url;
        }
        if let Ok(url) = std::env::var("API_LATEST_SENSOR_SYSTEM") {
            config.api.latest_sensor_system = url;
        }
        if let Ok(url) = std::env::var("API_LATEST_GATEWAY_SYSTEM") {
            config.api.latest_gateway_system = url;
        }

        if let Ok(dir) = std::env::var("DASHBOARD_DATA_DIR") {
            config.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(secs) = std::env::var("STALE_AFTER_SECS")
            && let Ok(s) = secs.parse()
        {
            config.staleness.stale_after_secs = Some(s);
        }
        if let Ok(secs) = std::env::var("OFFLINE_AFTER_SECS")
            && let Ok(s) = secs.parse()
        {
            config.staleness.offline_after_secs = s;
        }

        // Views follow the (possibly overridden) topics and URLs
        config.views = ViewKind::iter()
            .map(|kind| ViewConfig::for_kind(kind, &config.topics, &config.api))
            .collect();
        if let Ok(ordering) = std::env::var("POLL_ORDERING")
            && let Ok(ordering) = PollOrdering::from_str(&ordering)
        {
            for view in &mut config.views {
                view.poll_ordering = ordering;
            }
        }

        config
    }

    /// Look up a view by its kind name (e.g. "sensors").
    pub fn view(&self, name: &str) -> Result<&ViewConfig> {
        let kind = ViewKind::from_str(name)
            .map_err(|_| DashboardError::UnknownView(name.to_string()))?;
        self.views
            .iter()
            .find(|v| v.kind == kind)
            .ok_or_else(|| DashboardError::UnknownView(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_views_cover_every_kind() {
        let config = Config::default();
        assert_eq!(config.views.len(), ViewKind::iter().count());
        for view in &config.views {
            view.validate().unwrap();
        }
    }

    #[test]
    fn test_sensors_view_polls_every_four_seconds() {
        let config = Config::default();
        let view = config.view("sensors").unwrap();
        assert_eq!(view.capacity, 50);
        match &view.source {
            SourceConfig::Poll { url, interval_ms } => {
                assert_eq!(url, &config.api.latest_sensor);
                assert_eq!(*interval_ms, 4000);
            }
            other => panic!("expected poll source, got {:?}", other),
        }
    }

    #[test]
    fn test_gps_view_requires_coordinates() {
        let config = Config::default();
        let view = config.view("GPS").unwrap();
        assert!(view.require_coordinate);
        assert!(view.persist_history);
    }

    #[test]
    fn test_unknown_view_is_rejected() {
        let config = Config::default();
        assert!(matches!(
            config.view("weather-radar"),
            Err(DashboardError::UnknownView(_))
        ));
    }

    #[test]
    fn test_zero_capacity_fails_validation() {
        let config = Config::default();
        let mut view = config.view("transceiver").unwrap().clone();
        view.capacity = 0;
        assert!(view.validate().is_err());
    }

    #[test]
    fn test_overview_follows_configured_wildcard() {
        let mut config = Config::default();
        config.topics.all = "/station-7/#".to_string();
        let view = ViewConfig::for_kind(ViewKind::Overview, &config.topics, &config.api);
        match view.source {
            SourceConfig::Push { channels, .. } => assert_eq!(channels, vec!["/station-7/#"]),
            other => panic!("expected push source, got {:?}", other),
        }
    }

    #[test]
    fn test_poll_ordering_names() {
        assert_eq!(PollOrdering::from_str("latest").unwrap(), PollOrdering::LatestDispatched);
        assert_eq!(PollOrdering::from_str("Arrival").unwrap(), PollOrdering::ArrivalOrder);
        assert!(PollOrdering::from_str("newest").is_err());
    }

    #[test]
    fn test_env_flag_parsing() {
        assert_eq!(env_flag("TRUE"), Some(true));
        assert_eq!(env_flag(" off "), Some(false));
        assert_eq!(env_flag("maybe"), None);
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/var/lib/weathertech")),
        };
        assert_eq!(
            storage.resolve_data_dir(),
            PathBuf::from("/var/lib/weathertech")
        );
    }
}
