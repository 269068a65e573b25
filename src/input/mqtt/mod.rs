//! MQTT input source for the live sensor, system and gateway topics.

mod client;

pub use client::{BusEvent, BusMessage, MqttClient, topic_matches};
