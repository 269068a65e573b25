//! Connectivity classification from sample age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::Display;

/// Default age at which a sample is no longer considered live.
pub const DEFAULT_OFFLINE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ConnectivityState {
    Online,
    Stale,
    Offline,
}

/// Classifies a sample's age into a [`ConnectivityState`].
///
/// The default is two-state: younger than 60 s is Online, anything older is
/// Offline. An optional warning band inserts Stale between `stale_after` and
/// `offline_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessEvaluator {
    stale_after: Option<Duration>,
    offline_after: Duration,
}

impl Default for StalenessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLINE_AFTER)
    }
}

impl StalenessEvaluator {
    pub fn new(offline_after: Duration) -> Self {
        Self {
            stale_after: None,
            offline_after,
        }
    }

    /// Three-state evaluator. A band that starts after `offline_after` is ignored.
    pub fn with_warning_band(stale_after: Duration, offline_after: Duration) -> Self {
        Self {
            stale_after: (stale_after < offline_after).then_some(stale_after),
            offline_after,
        }
    }

    pub fn offline_after(&self) -> Duration {
        self.offline_after
    }

    pub fn classify(&self, sample_timestamp: DateTime<Utc>, now: DateTime<Utc>) -> ConnectivityState {
        // Future timestamps (clock skew) count as fresh
        let age = (now - sample_timestamp).to_std().unwrap_or(Duration::ZERO);

        if age >= self.offline_after {
            ConnectivityState::Offline
        } else if matches!(self.stale_after, Some(stale) if age >= stale) {
            ConnectivityState::Stale
        } else {
            ConnectivityState::Online
        }
    }
}
