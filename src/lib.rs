//! WeatherTech dashboard library.
//!
//! Keeps every dashboard view consistent with its live data sources (MQTT
//! push, REST polling), bounds the rolling history behind charts, classifies
//! source connectivity and restores the last known state across restarts.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod input;
pub mod presentation;
pub mod reconciler;
pub mod staleness;
pub mod store;
pub mod telemetry;

pub use config::{Config, ViewConfig, ViewKind};
pub use dashboard::{Dashboard, DashboardView, ViewHandle};
pub use error::{DashboardError, Result};
pub use reconciler::{UpdateOutcome, UpdateReconciler};
pub use staleness::{ConnectivityState, StalenessEvaluator};
