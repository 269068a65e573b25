//! Input sources for the dashboard.
//!
//! Current input sources:
//! - `mqtt`: push updates from the message bus
//! - `poll`: pull updates from the REST backend

pub mod mqtt;
pub mod poll;

pub use mqtt::{BusEvent, BusMessage, MqttClient};
pub use poll::{Fetcher, HttpFetcher};
