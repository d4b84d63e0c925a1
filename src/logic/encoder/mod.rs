//! Frame Encoder
//!
//! Wraps a telemetry frame into a self-describing transmission unit:
//! header (sequence, priority, declared size), payload (field map copy)
//! and footer (truncated SHA-256 digest, send timestamp).
//!
//! Priority is derived from frame content and only ever raised by later
//! rules, never lowered.

pub mod types;

use sha2::{Digest, Sha256};

use crate::constants::{
    BATTERY_TEMP_SAFE, DIGEST_LEN, PRIORITY_BASE, SOC_CRITICAL, SOC_LOW,
};
use crate::logic::errors::ConfigurationError;
use crate::logic::frame::{Frame, Payload};

pub use types::{EncoderStats, EncodingMode, TransmissionUnit, UnitFooter, UnitHeader};

// ============================================================================
// DIGEST
// ============================================================================

/// Canonical serialization of header+payload. The payload is a BTreeMap,
/// so key order is independent of how the map was built.
fn canonical_bytes(header: &UnitHeader, payload: &Payload) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(header).expect("header is always serializable");
    bytes.extend(serde_json::to_vec(payload).expect("payload is always serializable"));
    bytes
}

/// Truncated SHA-256 over the canonical header+payload serialization.
pub fn compute_digest(header: &UnitHeader, payload: &Payload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(header, payload));
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}

/// Pure verification: recompute the digest from the unit as it stands
/// and compare to the stored value. Usable by any stage or test.
pub fn verify_digest(unit: &TransmissionUnit) -> bool {
    compute_digest(&unit.header, &unit.payload) == unit.footer.digest
}

// ============================================================================
// PRIORITY
// ============================================================================

/// Content-derived priority in [0, 10]. Rules are applied lowest to
/// highest so each later rule can only raise the value.
fn compute_priority(frame: &Frame) -> u8 {
    let mut priority = PRIORITY_BASE;

    let science = frame.fields.get("science_active").copied().unwrap_or(0.0);
    if science >= 0.5 {
        priority = priority.max(6);
    }

    let soc = frame.fields.get("battery_soc").copied();
    if let Some(soc) = soc {
        if soc < SOC_LOW {
            priority = priority.max(8);
        }
    }

    if let Some(temp) = frame.fields.get("battery_temp") {
        if *temp < BATTERY_TEMP_SAFE.0 || *temp > BATTERY_TEMP_SAFE.1 {
            priority = priority.max(9);
        }
    }

    if let Some(soc) = soc {
        if soc < SOC_CRITICAL {
            priority = 10;
        }
    }

    priority
}

// ============================================================================
// ENCODER
// ============================================================================

pub struct Encoder {
    mode: EncodingMode,
    sequence: u64,
    frames_encoded: u64,
    bytes_declared: u64,
    high_priority_units: u64,
}

impl Encoder {
    /// Build an encoder for the named mode. Unrecognized modes fail at
    /// setup with a `ConfigurationError`.
    pub fn new(mode: &str) -> Result<Self, ConfigurationError> {
        let mode = match mode {
            "raw" => EncodingMode::Raw,
            other => {
                return Err(ConfigurationError::new(format!(
                    "unknown encoding mode '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            mode,
            sequence: 0,
            frames_encoded: 0,
            bytes_declared: 0,
            high_priority_units: 0,
        })
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Wrap a frame into a transmission unit. The sequence counter is
    /// incremented on every call and never rewound by a statistics reset.
    pub fn encode(&mut self, frame: &Frame) -> TransmissionUnit {
        self.sequence += 1;

        let payload = frame.to_payload();
        let priority = compute_priority(frame);

        // Declared size is measured with the size field zeroed, then
        // written into the header exactly once.
        let mut header = UnitHeader {
            sequence: self.sequence,
            timestamp: frame.timestamp,
            frame_id: frame.frame_id,
            priority,
            size_bytes: 0,
        };
        header.size_bytes = canonical_bytes(&header, &payload).len() as u64;

        let digest = compute_digest(&header, &payload);

        self.frames_encoded += 1;
        self.bytes_declared += header.size_bytes;
        if priority >= 8 {
            self.high_priority_units += 1;
        }

        TransmissionUnit {
            header,
            payload,
            footer: UnitFooter {
                digest,
                sent_at: frame.timestamp,
                corruption_detected: false,
                corrupted_fields: Vec::new(),
            },
        }
    }

    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_declared: self.bytes_declared,
            high_priority_units: self.high_priority_units,
            sequence: self.sequence,
        }
    }

    /// Zero the counters. The sequence counter survives; only a full
    /// `reset` clears it.
    pub fn reset_statistics(&mut self) {
        self.frames_encoded = 0;
        self.bytes_declared = 0;
        self.high_priority_units = 0;
    }

    /// Full pipeline reset: statistics and sequence state.
    pub fn reset(&mut self) {
        self.reset_statistics();
        self.sequence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::frame::FieldValue;
    use std::collections::BTreeMap;

    fn frame_with(fields: &[(&str, f64)]) -> Frame {
        let map: BTreeMap<String, f64> =
            fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Frame::new(100.0, 7, map)
    }

    #[test]
    fn test_unknown_mode_is_configuration_error() {
        assert!(Encoder::new("raw").is_ok());
        assert!(Encoder::new("base64").is_err());
    }

    #[test]
    fn test_digest_round_trip() {
        let mut encoder = Encoder::new("raw").unwrap();
        let unit = encoder.encode(&frame_with(&[("battery_soc", 75.0), ("cpu_temp", 20.0)]));
        assert!(verify_digest(&unit));

        // Any payload change must break verification
        let mut tampered = unit.clone();
        tampered
            .payload
            .insert("battery_soc".to_string(), FieldValue::Numeric(10.0));
        assert!(!verify_digest(&tampered));
    }

    #[test]
    fn test_digest_is_order_independent() {
        let mut encoder = Encoder::new("raw").unwrap();
        let unit = encoder.encode(&frame_with(&[("a", 1.0), ("b", 2.0)]));

        // Rebuilding the payload in reverse insertion order must not
        // change the digest.
        let mut reordered = unit.payload.clone();
        let a = reordered.remove("a").unwrap();
        reordered.insert("a".to_string(), a);
        assert_eq!(compute_digest(&unit.header, &reordered), unit.footer.digest);
    }

    #[test]
    fn test_priority_rules_monotone() {
        // Nominal frame: base priority
        assert_eq!(
            compute_priority(&frame_with(&[("battery_soc", 75.0), ("battery_temp", 20.0)])),
            5
        );
        // Science window only
        assert_eq!(
            compute_priority(&frame_with(&[("battery_soc", 75.0), ("science_active", 1.0)])),
            6
        );
        // Low battery wins over science
        assert_eq!(
            compute_priority(&frame_with(&[("battery_soc", 35.0), ("science_active", 1.0)])),
            8
        );
        // Unsafe temperature outranks low battery
        assert_eq!(
            compute_priority(&frame_with(&[("battery_soc", 35.0), ("battery_temp", 50.0)])),
            9
        );
        // Critical battery is absolute
        assert_eq!(
            compute_priority(&frame_with(&[("battery_soc", 10.0), ("battery_temp", 50.0)])),
            10
        );
    }

    #[test]
    fn test_sequence_survives_statistics_reset() {
        let mut encoder = Encoder::new("raw").unwrap();
        encoder.encode(&frame_with(&[("battery_soc", 75.0)]));
        encoder.encode(&frame_with(&[("battery_soc", 74.0)]));
        assert_eq!(encoder.stats().sequence, 2);
        assert_eq!(encoder.stats().frames_encoded, 2);

        encoder.reset_statistics();
        assert_eq!(encoder.stats().frames_encoded, 0);
        assert_eq!(encoder.stats().sequence, 2);

        encoder.reset();
        assert_eq!(encoder.stats().sequence, 0);
    }

    #[test]
    fn test_declared_size_matches_canonical_serialization() {
        let mut encoder = Encoder::new("raw").unwrap();
        let unit = encoder.encode(&frame_with(&[("battery_soc", 75.0)]));

        let mut zeroed = unit.header.clone();
        zeroed.size_bytes = 0;
        let expected = canonical_bytes(&zeroed, &unit.payload).len() as u64;
        assert_eq!(unit.header.size_bytes, expected);
        assert!(unit.header.size_bytes > 0);
    }
}
