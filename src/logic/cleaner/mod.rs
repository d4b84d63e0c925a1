//! Validator / Repairer
//!
//! Turns a possibly-absent, possibly-corrupted transmission unit into a
//! cleaned frame. Digest verification picks the starting quality, every
//! field is repaired against the shared schema, and a bounded history of
//! produced frames provides interpolation context.
//!
//! Returning `None` is the single failure mode: the unit was lost and
//! history is too short to extrapolate. The caller skips the timestep.

pub mod types;

use std::collections::{BTreeMap, VecDeque};

use crate::constants::{LOW_QUALITY_REPAIRS, SANITY_BOUND};
use crate::logic::channel::DegradedUnit;
use crate::logic::encoder::{verify_digest, TransmissionUnit};
use crate::logic::frame::FieldValue;
use crate::logic::schema::TelemetrySchema;

pub use types::{CleanFrame, CleanMetadata, CleanerStats, Quality, RepairMethod, RepairRecord};

pub struct Cleaner {
    schema: TelemetrySchema,
    history: VecDeque<CleanFrame>,
    history_size: usize,
    packets_cleaned: u64,
    packets_interpolated: u64,
    packets_unrecoverable: u64,
    checksum_failures: u64,
    fields_repaired: u64,
}

impl Cleaner {
    pub fn new(schema: TelemetrySchema, history_size: usize) -> Self {
        Self {
            schema,
            history: VecDeque::with_capacity(history_size),
            history_size: history_size.max(2),
            packets_cleaned: 0,
            packets_interpolated: 0,
            packets_unrecoverable: 0,
            checksum_failures: 0,
            fields_repaired: 0,
        }
    }

    /// Clean one channel outcome. `None` means the timestep is dropped.
    pub fn clean(&mut self, degraded: DegradedUnit) -> Option<CleanFrame> {
        match degraded {
            DegradedUnit::Lost => self.synthesize_from_history(),
            DegradedUnit::Received(unit) => Some(self.repair_unit(unit)),
        }
    }

    // ------------------------------------------------------------------
    // Lost packets: extrapolate or give up
    // ------------------------------------------------------------------

    fn synthesize_from_history(&mut self) -> Option<CleanFrame> {
        if self.history.len() < 2 {
            self.packets_unrecoverable += 1;
            log::debug!(
                "lost packet unrecoverable: history has {} entries",
                self.history.len()
            );
            return None;
        }

        let older = &self.history[self.history.len() - 2];
        let newer = &self.history[self.history.len() - 1];

        // Timestamp advances by the same delta as the last two entries
        let dt = newer.timestamp - older.timestamp;
        let timestamp = newer.timestamp + dt;
        let frame_id = newer.frame_id + 1;

        let mut fields = BTreeMap::new();
        for (name, v2) in &newer.fields {
            let value = match older.fields.get(name) {
                Some(v1) => v2 + (v2 - v1),
                None => *v2,
            };
            fields.insert(name.clone(), value);
        }

        let frame = CleanFrame {
            timestamp,
            frame_id,
            fields,
            metadata: CleanMetadata {
                quality: Quality::Interpolated,
                checksum_valid: false,
                repairs: Vec::new(),
                warnings: vec!["frame synthesized from history after packet loss".to_string()],
            },
        };

        self.packets_interpolated += 1;
        self.push_history(frame.clone());
        Some(frame)
    }

    // ------------------------------------------------------------------
    // Received packets: verify, then repair field by field
    // ------------------------------------------------------------------

    fn repair_unit(&mut self, unit: TransmissionUnit) -> CleanFrame {
        let checksum_valid = verify_digest(&unit);
        if !checksum_valid {
            self.checksum_failures += 1;
        }
        let base_quality = if checksum_valid { Quality::High } else { Quality::Degraded };

        let timestamp = unit.header.timestamp;
        let mut warnings = Vec::new();
        if let Some(last) = self.history.back() {
            if timestamp <= last.timestamp {
                warnings.push(format!(
                    "non-monotonic timestamp {} after {}",
                    timestamp, last.timestamp
                ));
            }
        }

        let mut fields = BTreeMap::new();
        let mut repairs = Vec::new();
        for (name, raw) in &unit.payload {
            let (value, method) = self.clean_field(name, raw, timestamp);
            if let Some(method) = method {
                repairs.push(RepairRecord {
                    field: name.clone(),
                    method,
                    original: raw.clone(),
                    repaired: value,
                });
            }
            fields.insert(name.clone(), value);
        }

        // Quality is downgraded by repair count, never upgraded
        let quality = match repairs.len() {
            0 => base_quality,
            n if n <= LOW_QUALITY_REPAIRS => base_quality.worse_of(Quality::Medium),
            _ => base_quality.worse_of(Quality::Low),
        };

        self.packets_cleaned += 1;
        self.fields_repaired += repairs.len() as u64;

        let frame = CleanFrame {
            timestamp,
            frame_id: unit.header.frame_id,
            fields,
            metadata: CleanMetadata { quality, checksum_valid, repairs, warnings },
        };
        self.push_history(frame.clone());
        frame
    }

    /// Fixed priority order, first match wins:
    /// (a) missing / non-numeric / outside the sanity band,
    /// (b) outside the declared valid range,
    /// (c) rate-of-change violation,
    /// (d) pass through.
    fn clean_field(
        &self,
        name: &str,
        raw: &FieldValue,
        timestamp: f64,
    ) -> (f64, Option<RepairMethod>) {
        let spec = self.schema.field(name);

        let sane = raw
            .as_numeric()
            .filter(|v| v.is_finite() && v.abs() <= SANITY_BOUND);

        let value = match sane {
            Some(v) => v,
            None => {
                if let Some((v1, v2)) = self.last_two_values(name) {
                    return (v2 + (v2 - v1), Some(RepairMethod::Interpolation));
                }
                if let Some(spec) = spec {
                    return (spec.midpoint(), Some(RepairMethod::RangeMidpoint));
                }
                return (0.0, Some(RepairMethod::DefaultZero));
            }
        };

        if let Some(spec) = spec {
            let (lo, hi) = spec.valid_range;
            if value < lo || value > hi {
                return (value.clamp(lo, hi), Some(RepairMethod::Clamp));
            }

            if let Some(max_rate) = spec.max_rate {
                if let Some((last_ts, last_value)) = self.last_value(name) {
                    let dt = timestamp - last_ts;
                    if dt > 0.0 && (value - last_value).abs() / dt > max_rate {
                        if let Some((v1, v2)) = self.last_two_values(name) {
                            return (v2 + (v2 - v1), Some(RepairMethod::RateInterpolation));
                        }
                        return (last_value, Some(RepairMethod::HoldLast));
                    }
                }
            }
        }

        (value, None)
    }

    // ------------------------------------------------------------------
    // History access
    // ------------------------------------------------------------------

    fn push_history(&mut self, frame: CleanFrame) {
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(frame);
    }

    /// Most recent (timestamp, value) of a field.
    fn last_value(&self, field: &str) -> Option<(f64, f64)> {
        self.history
            .iter()
            .rev()
            .find_map(|f| f.fields.get(field).map(|v| (f.timestamp, *v)))
    }

    /// Last two values of a field as (older, newer).
    fn last_two_values(&self, field: &str) -> Option<(f64, f64)> {
        let mut newest = None;
        for frame in self.history.iter().rev() {
            if let Some(v) = frame.fields.get(field) {
                match newest {
                    None => newest = Some(*v),
                    Some(v2) => return Some((*v, v2)),
                }
            }
        }
        None
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn stats(&self) -> CleanerStats {
        let produced = (self.packets_cleaned + self.packets_interpolated).max(1) as f64;
        CleanerStats {
            packets_cleaned: self.packets_cleaned,
            packets_interpolated: self.packets_interpolated,
            packets_unrecoverable: self.packets_unrecoverable,
            checksum_failures: self.checksum_failures,
            fields_repaired: self.fields_repaired,
            repair_rate: self.fields_repaired as f64 / produced,
        }
    }

    /// Zero the counters; history and interpolation context survive.
    pub fn reset_statistics(&mut self) {
        self.packets_cleaned = 0;
        self.packets_interpolated = 0;
        self.packets_unrecoverable = 0;
        self.checksum_failures = 0;
        self.fields_repaired = 0;
    }

    /// Full mission reset: statistics and history.
    pub fn reset(&mut self) {
        self.reset_statistics();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::encoder::{Encoder, TransmissionUnit};
    use crate::logic::frame::Frame;

    fn encode(fields: &[(&str, f64)], timestamp: f64, frame_id: u64) -> TransmissionUnit {
        let map: BTreeMap<String, f64> =
            fields.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let mut encoder = Encoder::new("raw").unwrap();
        encoder.encode(&Frame::new(timestamp, frame_id, map))
    }

    fn cleaner() -> Cleaner {
        Cleaner::new(TelemetrySchema::rover_default(), 10)
    }

    #[test]
    fn test_clean_unit_keeps_high_quality() {
        let mut cleaner = cleaner();
        let unit = encode(&[("battery_soc", 75.0), ("cpu_temp", 20.0)], 0.0, 0);
        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();

        assert_eq!(frame.metadata.quality, Quality::High);
        assert!(frame.metadata.checksum_valid);
        assert!(frame.metadata.repairs.is_empty());
        assert_eq!(frame.fields["battery_soc"], 75.0);
    }

    #[test]
    fn test_lost_unit_unrecoverable_without_history() {
        let mut cleaner = cleaner();
        assert!(cleaner.clean(DegradedUnit::Lost).is_none());

        let unit = encode(&[("battery_soc", 75.0)], 0.0, 0);
        cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        // Still only one history entry
        assert!(cleaner.clean(DegradedUnit::Lost).is_none());
        assert_eq!(cleaner.stats().packets_unrecoverable, 2);
    }

    #[test]
    fn test_lost_unit_interpolated_with_history() {
        let mut cleaner = cleaner();
        for (ts, soc) in [(0.0, 80.0), (1.0, 78.0)] {
            let unit = encode(&[("battery_soc", soc)], ts, ts as u64);
            cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        }

        let frame = cleaner.clean(DegradedUnit::Lost).expect("interpolated");
        assert_eq!(frame.metadata.quality, Quality::Interpolated);
        assert!(!frame.metadata.checksum_valid);
        assert_eq!(frame.timestamp, 2.0);
        assert_eq!(frame.frame_id, 2);
        // Linear extrapolation: 78 + (78 - 80) = 76
        assert_eq!(frame.fields["battery_soc"], 76.0);
        // Interpolated frames join the history
        assert_eq!(cleaner.history_len(), 3);
    }

    #[test]
    fn test_bad_digest_downgrades_to_degraded() {
        let mut cleaner = cleaner();
        let mut unit = encode(&[("battery_soc", 75.0)], 0.0, 0);
        unit.footer.digest = "0000000000000000".to_string();

        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.metadata.quality, Quality::Degraded);
        assert!(!frame.metadata.checksum_valid);
        assert_eq!(cleaner.stats().checksum_failures, 1);
    }

    #[test]
    fn test_missing_field_repaired_by_midpoint_then_interpolation() {
        let mut cleaner = cleaner();

        // No history: midpoint of battery_soc's (0, 100) range
        let mut unit = encode(&[("battery_soc", 75.0)], 0.0, 0);
        unit.payload.insert("battery_soc".to_string(), FieldValue::Missing);
        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.fields["battery_soc"], 50.0);
        assert_eq!(frame.metadata.repairs[0].method, RepairMethod::RangeMidpoint);
        assert_eq!(frame.metadata.quality, Quality::Medium);

        // Build two history entries, then a missing value interpolates
        let unit = encode(&[("battery_soc", 52.0)], 1.0, 1);
        cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        let mut unit = encode(&[("battery_soc", 75.0)], 2.0, 2);
        unit.payload.insert("battery_soc".to_string(), FieldValue::Missing);
        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        // 52 + (52 - 50) = 54
        assert_eq!(frame.fields["battery_soc"], 54.0);
        assert_eq!(frame.metadata.repairs[0].method, RepairMethod::Interpolation);
    }

    #[test]
    fn test_type_error_and_sentinel_take_the_sanity_path() {
        let mut cleaner = cleaner();
        let mut unit = encode(&[("battery_soc", 75.0), ("cpu_temp", 20.0)], 0.0, 0);
        unit.payload
            .insert("battery_soc".to_string(), FieldValue::Invalid("#ERR".to_string()));
        unit.payload
            .insert("cpu_temp".to_string(), FieldValue::Numeric(1e9));

        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.fields["battery_soc"], 50.0); // midpoint of (0, 100)
        assert_eq!(frame.fields["cpu_temp"], 22.5); // midpoint of (-40, 85)
        assert_eq!(frame.metadata.repairs.len(), 2);
    }

    #[test]
    fn test_out_of_range_value_is_clamped() {
        let mut cleaner = cleaner();
        let mut unit = encode(&[("battery_soc", 75.0)], 0.0, 0);
        // Within the sanity band but above the declared range
        unit.payload.insert("battery_soc".to_string(), FieldValue::Numeric(140.0));

        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.fields["battery_soc"], 100.0);
        assert_eq!(frame.metadata.repairs[0].method, RepairMethod::Clamp);
    }

    #[test]
    fn test_rate_violation_repaired() {
        let mut cleaner = cleaner();
        // battery_soc max_rate is 5 %/s
        let unit = encode(&[("battery_soc", 80.0)], 0.0, 0);
        cleaner.clean(DegradedUnit::Received(unit)).unwrap();

        // Only one history entry carries the field: hold last
        let unit = encode(&[("battery_soc", 20.0)], 1.0, 1);
        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.metadata.repairs[0].method, RepairMethod::HoldLast);
        assert_eq!(frame.fields["battery_soc"], 80.0);

        // Two history entries: extrapolate instead
        let unit = encode(&[("battery_soc", 20.0)], 2.0, 2);
        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.metadata.repairs[0].method, RepairMethod::RateInterpolation);
        assert_eq!(frame.fields["battery_soc"], 80.0); // 80 + (80 - 80)
    }

    #[test]
    fn test_many_repairs_downgrade_to_low() {
        let mut cleaner = cleaner();
        let mut unit = encode(
            &[
                ("battery_soc", 75.0),
                ("cpu_temp", 20.0),
                ("roll", 0.0),
                ("pitch", 0.0),
            ],
            0.0,
            0,
        );
        for name in ["battery_soc", "cpu_temp", "roll", "pitch"] {
            unit.payload.insert(name.to_string(), FieldValue::Missing);
        }

        let frame = cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        assert_eq!(frame.metadata.repairs.len(), 4);
        assert_eq!(frame.metadata.quality, Quality::Low);
    }

    #[test]
    fn test_statistics_reset_keeps_history() {
        let mut cleaner = cleaner();
        for ts in 0..3 {
            let unit = encode(&[("battery_soc", 75.0)], ts as f64, ts);
            cleaner.clean(DegradedUnit::Received(unit)).unwrap();
        }
        assert_eq!(cleaner.stats().packets_cleaned, 3);

        cleaner.reset_statistics();
        assert_eq!(cleaner.stats().packets_cleaned, 0);
        assert_eq!(cleaner.history_len(), 3);

        cleaner.reset();
        assert_eq!(cleaner.history_len(), 0);
    }
}
