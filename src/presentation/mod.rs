//! Presentation port.
//!
//! The reconciler never renders anything itself. It hands a
//! [`CanonicalView`] to whatever implements [`PresentationPort`]: a terminal
//! logger, a channel feeding a UI task, a web socket bridge.

mod csv;
pub mod format;
mod log_presenter;

pub use csv::{CSV_HEADER, to_csv};
pub use log_presenter::LogPresenter;

use crate::staleness::ConnectivityState;
use crate::telemetry::{Field, Sample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use tokio::sync::mpsc;

/// Where the displayed data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Provenance {
    /// Applied from a bus message or poll response in this session
    #[strum(serialize = "live")]
    Live,
    /// Restored from the cache at startup
    #[strum(serialize = "last known")]
    LastKnown,
}

/// Normalized `(latest, history, connectivity)` tuple handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalView {
    pub view_key: String,
    /// Displayed sample, merged across partial updates
    pub latest: Sample,
    /// Chronological, capacity-bounded
    pub history: Vec<Sample>,
    pub connectivity: ConnectivityState,
    pub provenance: Provenance,
    /// Min/max over the history for every field that has numeric data
    pub ranges: BTreeMap<Field, (f64, f64)>,
}

impl CanonicalView {
    pub fn range(&self, field: Field) -> Option<(f64, f64)> {
        self.ranges.get(&field).copied()
    }

    /// Chart points for `field` over the history, unparsable values skipped.
    pub fn series(&self, field: Field) -> Vec<f64> {
        self.history.iter().filter_map(|s| s.number(field)).collect()
    }
}

/// Sink for canonical views.
///
/// Called at most once per applied update, on the view's own task.
pub trait PresentationPort: Send {
    fn present(&mut self, view: &CanonicalView);
}

/// Forwards every view to a channel, for renderers running on another task.
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<CanonicalView>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CanonicalView>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PresentationPort for ChannelPresenter {
    fn present(&mut self, view: &CanonicalView) {
        if self.tx.send(view.clone()).is_err() {
            log::debug!("[View] Presentation channel closed, dropping '{}'", view.view_key);
        }
    }
}
