//! Telemetry data model: samples, field catalogue and payload normalization.

mod field;
mod payload;
mod sample;

pub use field::{Field, FieldValue, TIMESTAMP_SYNONYMS};
pub use payload::{Payload, normalize_object, parse_timestamp};
pub use sample::{GeoPoint, Sample};
