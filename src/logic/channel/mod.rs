//! Channel Simulator
//!
//! Probabilistic model of radio-link damage: whole-packet loss, Gaussian
//! timing jitter on the send timestamp, and independent per-field payload
//! corruption. All randomness comes from one seedable generator so a
//! fixed seed replays the identical damage sequence.
//!
//! The stored digest is deliberately left stale after corruption so
//! downstream verification fails - damage is never silently re-validated.

pub mod types;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::constants::{OVERFLOW_SENTINEL, TYPE_ERROR_MARKER};
use crate::logic::encoder::TransmissionUnit;
use crate::logic::frame::FieldValue;

pub use types::{ChannelStats, CorruptionMode, DegradedUnit};

pub struct ChannelSimulator {
    loss_rate: f64,
    field_corruption_rate: f64,
    jitter_stddev: f64,
    rng: StdRng,
    packets_in: u64,
    packets_lost: u64,
    packets_corrupted: u64,
    fields_corrupted: u64,
}

impl ChannelSimulator {
    pub fn new(loss_rate: f64, field_corruption_rate: f64, jitter_stddev: f64, seed: u64) -> Self {
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
            field_corruption_rate: field_corruption_rate.clamp(0.0, 1.0),
            jitter_stddev: jitter_stddev.max(0.0),
            rng: StdRng::seed_from_u64(seed),
            packets_in: 0,
            packets_lost: 0,
            packets_corrupted: 0,
            fields_corrupted: 0,
        }
    }

    /// Run one unit through the simulated link. Operates on a private
    /// copy; the encoder's original is never mutated.
    pub fn corrupt(&mut self, unit: &TransmissionUnit) -> DegradedUnit {
        self.packets_in += 1;

        // Step 1: whole-packet loss ends processing immediately
        if self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate) {
            self.packets_lost += 1;
            log::debug!("packet seq={} lost in transit", unit.header.sequence);
            return DegradedUnit::Lost;
        }

        let mut damaged = unit.clone();

        // Step 2: Gaussian jitter on the send timestamp
        if self.jitter_stddev > 0.0 {
            let normal = Normal::new(0.0, self.jitter_stddev)
                .expect("jitter stddev is finite and non-negative");
            damaged.footer.sent_at += normal.sample(&mut self.rng);
        }

        // Step 3: independent per-field corruption. BTreeMap order keeps
        // the RNG draw sequence reproducible.
        let mut corrupted_fields = Vec::new();
        let names: Vec<String> = damaged.payload.keys().cloned().collect();
        for name in names {
            if self.field_corruption_rate == 0.0
                || !self.rng.gen_bool(self.field_corruption_rate)
            {
                continue;
            }

            let mode = match self.rng.gen_range(0..3) {
                0 => CorruptionMode::Remove,
                1 => CorruptionMode::Distort,
                _ => CorruptionMode::TypeError,
            };
            let original = damaged.payload.get(&name).cloned().unwrap_or(FieldValue::Missing);
            let replacement = self.apply_mode(mode, &original);
            damaged.payload.insert(name.clone(), replacement);
            corrupted_fields.push(name);
        }

        // Step 4: flag corruption; the digest stays as computed at encode
        // time, now mismatching the payload.
        if !corrupted_fields.is_empty() {
            self.packets_corrupted += 1;
            self.fields_corrupted += corrupted_fields.len() as u64;
            log::debug!(
                "packet seq={} corrupted fields: {:?}",
                unit.header.sequence,
                corrupted_fields
            );
            damaged.footer.corruption_detected = true;
            damaged.footer.corrupted_fields = corrupted_fields;
        }

        DegradedUnit::Received(damaged)
    }

    fn apply_mode(&mut self, mode: CorruptionMode, original: &FieldValue) -> FieldValue {
        match mode {
            CorruptionMode::Remove => FieldValue::Missing,
            CorruptionMode::TypeError => FieldValue::Invalid(TYPE_ERROR_MARKER.to_string()),
            CorruptionMode::Distort => {
                let Some(v) = original.as_numeric() else {
                    // Nothing numeric left to distort
                    return FieldValue::Missing;
                };
                match self.rng.gen_range(0..3) {
                    0 => {
                        // Additive noise scaled to the value's magnitude
                        let scale = v.abs().max(1.0);
                        let noise = Normal::new(0.0, scale)
                            .expect("noise scale is finite and positive");
                        FieldValue::Numeric(v + noise.sample(&mut self.rng))
                    }
                    1 => {
                        // Multiplicative scaling error
                        let factor = self.rng.gen_range(-10.0..10.0);
                        FieldValue::Numeric(v * factor)
                    }
                    _ => {
                        // Overflow sentinel, sign chosen at random
                        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                        FieldValue::Numeric(sign * OVERFLOW_SENTINEL)
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> ChannelStats {
        let packets = self.packets_in.max(1) as f64;
        ChannelStats {
            packets_in: self.packets_in,
            packets_lost: self.packets_lost,
            packets_corrupted: self.packets_corrupted,
            fields_corrupted: self.fields_corrupted,
            observed_loss_rate: self.packets_lost as f64 / packets,
            observed_corruption_rate: self.packets_corrupted as f64 / packets,
        }
    }

    pub fn reset_statistics(&mut self) {
        self.packets_in = 0;
        self.packets_lost = 0;
        self.packets_corrupted = 0;
        self.fields_corrupted = 0;
    }
}
