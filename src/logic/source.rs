//! Synthetic Frame Source
//!
//! Seedable cursor that produces telemetry frames one at a time: a
//! bounded random walk around each field's nominal value, plus a
//! day/night science-window flag. Restartable only by constructing a
//! fresh instance with the same seed.
//!
//! This stands in for the physical rover simulator; the pipeline treats
//! it as an opaque frame producer.

use std::collections::BTreeMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::logic::frame::Frame;
use crate::logic::schema::TelemetrySchema;

/// Fraction of the valid range a field may move per step
const WALK_STEP_FRACTION: f64 = 0.005;

/// Length of the simulated day/night cycle, seconds
const DAY_CYCLE_SECS: f64 = 600.0;

pub struct SyntheticFrameSource {
    schema: TelemetrySchema,
    timestep: f64,
    max_frames: u64,
    rng: StdRng,
    current: BTreeMap<String, f64>,
    elapsed: f64,
    frame_count: u64,
}

impl SyntheticFrameSource {
    pub fn new(schema: TelemetrySchema, timestep: f64, max_frames: u64, seed: u64) -> Self {
        let current = schema
            .field_names()
            .map(|name| {
                let nominal = schema.field(name).map(|s| s.nominal).unwrap_or(0.0);
                (name.clone(), nominal)
            })
            .collect();

        Self {
            schema,
            timestep,
            max_frames,
            rng: StdRng::seed_from_u64(seed),
            current,
            elapsed: 0.0,
            frame_count: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.frame_count < self.max_frames
    }

    /// Advance the walk one timestep and emit a frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if !self.has_next() {
            return None;
        }

        // BTreeMap iteration order keeps the RNG draw sequence stable
        // across runs with the same seed.
        let names: Vec<String> = self.current.keys().cloned().collect();
        for name in names {
            if name == "science_active" {
                continue;
            }
            let Some(spec) = self.schema.field(&name) else { continue };
            let (lo, hi) = spec.valid_range;
            let step = (hi - lo) * WALK_STEP_FRACTION;
            let delta = self.rng.gen_range(-step..=step);
            let entry = self.current.get_mut(&name).expect("walk field exists");
            *entry = (*entry + delta).clamp(lo, hi);
        }

        // Science window opens during the simulated day
        let daylight = (self.elapsed % DAY_CYCLE_SECS) < DAY_CYCLE_SECS / 2.0;
        self.current
            .insert("science_active".to_string(), if daylight { 1.0 } else { 0.0 });

        let frame = Frame::new(self.elapsed, self.frame_count, self.current.clone());
        self.elapsed += self.timestep;
        self.frame_count += 1;
        Some(frame)
    }
}

impl Iterator for SyntheticFrameSource {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.next_frame()
    }
}
