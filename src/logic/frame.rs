//! Frame Types
//!
//! Ground-truth telemetry frame entering the pipeline and the tagged
//! field value that survives transmission damage.
//! No logic here - only data structures.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// FIELD VALUE
// ============================================================================

/// One payload field after (possible) channel damage.
///
/// A field starts out numeric; the channel simulator can null it out
/// (`Missing`) or replace it with a non-numeric marker (`Invalid`).
/// The cleaner pattern-matches on this instead of sniffing runtime types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Numeric(f64),
    Invalid(String),
    Missing,
}

impl FieldValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Numeric(_))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Numeric(v)
    }
}

// ============================================================================
// FRAME
// ============================================================================

/// Field name -> damaged value map carried by a transmission unit.
/// BTreeMap keeps serialization order-independent of insertion order,
/// which the digest relies on.
pub type Payload = BTreeMap<String, FieldValue>;

/// One timestamped set of sensor readings, as produced by the frame
/// source. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Mission elapsed time, seconds; strictly increasing per run
    pub timestamp: f64,
    /// Sequence id assigned by the frame source
    pub frame_id: u64,
    /// Sensor field name -> reading
    pub fields: BTreeMap<String, f64>,
}

impl Frame {
    pub fn new(timestamp: f64, frame_id: u64, fields: BTreeMap<String, f64>) -> Self {
        Self { timestamp, frame_id, fields }
    }

    /// Copy the readings into a transmission payload.
    pub fn to_payload(&self) -> Payload {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::Numeric(*v)))
            .collect()
    }
}
