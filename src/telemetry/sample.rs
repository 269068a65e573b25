//! Canonical sample type.

use super::field::{Field, FieldValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One timestamped reading-set from a sensor node, transceiver or gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Capture time (backend timestamp, or arrival time when none was sent)
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub fields: BTreeMap<Field, FieldValue>,
}

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Receivers report 0.0/0.0 until they have a lock.
    pub fn has_fix(&self) -> bool {
        self.lat != 0.0 && self.lng != 0.0
    }
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter, mostly for tests and fixtures.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Numeric value of a field, `None` if absent or unparsable.
    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay `update` onto this sample.
    ///
    /// Fields absent from the update keep their current value; the capture
    /// timestamp moves to the update's.
    pub fn merge_from(&mut self, update: &Sample) {
        for (field, value) in &update.fields {
            self.fields.insert(*field, value.clone());
        }
        self.timestamp = update.timestamp;
    }

    /// Position carried by this sample, if both coordinates parse.
    pub fn coordinate(&self) -> Option<GeoPoint> {
        Some(GeoPoint {
            lat: self.number(Field::Latitude)?,
            lng: self.number(Field::Longitude)?,
        })
    }

    /// Remove a coordinate without a fix so it never reaches the display.
    pub fn drop_unfixed_coordinate(&mut self) -> bool {
        let unfixed = matches!(self.coordinate(), Some(p) if !p.has_fix());
        if unfixed {
            self.fields.remove(&Field::Latitude);
            self.fields.remove(&Field::Longitude);
        }
        unfixed
    }
}
