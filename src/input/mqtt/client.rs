//! MQTT client wrapper for the WeatherTech telemetry topics.

use crate::config::MqttConfig;
use crate::error::Result;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Pause between reconnection attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Message received from the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// What the bus reports to its consumer, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Message(BusMessage),
    ConnectionLost(String),
}

/// MQTT client owned by a single dashboard view.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    topics: Vec<String>,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    ///
    /// `client_id` must be unique per connection; brokers kick the older
    /// session when two clients share an id.
    pub fn new(config: &MqttConfig, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }
        if config.use_tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self {
            client,
            event_loop,
            topics: Vec::new(),
        }
    }

    /// Register a topic filter. Subscriptions are (re)issued on every ConnAck.
    pub fn subscribe(&mut self, topic: &str) {
        if !self.topics.iter().any(|t| t == topic) {
            self.topics.push(topic.to_string());
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Run the MQTT event loop and forward bus events to the provided channel.
    ///
    /// Runs until `cancel` fires or the receiving side is dropped. Connection
    /// errors are reported once per outage and retried after a fixed delay.
    pub async fn run<T>(mut self, tx: mpsc::Sender<T>, cancel: CancellationToken)
    where
        T: From<BusEvent> + Send + 'static,
    {
        info!("[MQTT] Starting event loop ({} topics)", self.topics.len());
        let mut connected = false;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.event_loop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected = true;
                    info!("[MQTT] Connected, subscribing to {:?}", self.topics);
                    if let Err(e) = subscribe_all(&self.client, &self.topics) {
                        warn!("[MQTT] Failed to subscribe: {}", e);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!(
                        "[MQTT] Received {} bytes on {}",
                        publish.payload.len(),
                        publish.topic
                    );
                    let msg = BusMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(BusEvent::Message(msg).into()).await.is_err() {
                        debug!("[MQTT] Message channel closed");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if connected {
                        error!("[MQTT] Connection lost: {:?}", e);
                        connected = false;
                        if tx
                            .send(BusEvent::ConnectionLost(e.to_string()).into())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    } else {
                        warn!("[MQTT] Connection attempt failed: {:?}", e);
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            debug!("[MQTT] Disconnect request failed: {:?}", e);
        }
        info!("[MQTT] Event loop stopped");
    }
}

/// Queue a subscription for every topic filter.
fn subscribe_all(client: &AsyncClient, topics: &[String]) -> Result<()> {
    for topic in topics {
        client.try_subscribe(topic.as_str(), QoS::AtMostOnce)?;
    }
    Ok(())
}

/// MQTT topic filter matching with `+` and `#` wildcards.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
