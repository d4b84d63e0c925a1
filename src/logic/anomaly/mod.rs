//! Anomaly Detector
//!
//! Runs three independent detectors over every cleaned frame - fixed
//! thresholds, rate-of-change limits and a rolling z-score - and attaches
//! the concatenated findings. A field may trigger more than one detector
//! in the same frame.
//!
//! Histories are updated only after all three detectors have run, so the
//! current value never competes with itself.

pub mod statistical;
pub mod threshold;
pub mod types;

use std::collections::HashMap;

use crate::constants::{DEFAULT_DETECTOR_HISTORY, DEFAULT_Z_THRESHOLD};
use crate::logic::cleaner::CleanFrame;
use crate::logic::schema::TelemetrySchema;

use statistical::FieldWindow;

pub use types::{Anomaly, DetectionKind, DetectorStats, LabeledFrame, Severity};

pub struct AnomalyDetector {
    schema: TelemetrySchema,
    z_threshold: f64,
    history_size: usize,
    field_history: HashMap<String, FieldWindow>,
    previous: Option<CleanFrame>,
    frames_analyzed: u64,
    threshold_anomalies: u64,
    derivative_anomalies: u64,
    zscore_anomalies: u64,
    critical_count: u64,
    warning_count: u64,
}

impl AnomalyDetector {
    pub fn new(schema: TelemetrySchema, history_size: usize, z_threshold: f64) -> Self {
        Self {
            schema,
            z_threshold,
            history_size: history_size.max(crate::constants::Z_SCORE_MIN_SAMPLES),
            field_history: HashMap::new(),
            previous: None,
            frames_analyzed: 0,
            threshold_anomalies: 0,
            derivative_anomalies: 0,
            zscore_anomalies: 0,
            critical_count: 0,
            warning_count: 0,
        }
    }

    pub fn with_defaults(schema: TelemetrySchema) -> Self {
        Self::new(schema, DEFAULT_DETECTOR_HISTORY, DEFAULT_Z_THRESHOLD)
    }

    /// Label one cleaned frame. The anomalies list replaces any prior
    /// value; findings are deterministic for a given detector state, but
    /// each call mutates the histories exactly once.
    pub fn analyze(&mut self, frame: CleanFrame) -> LabeledFrame {
        let mut anomalies = Vec::new();

        for (name, value) in &frame.fields {
            // Detector 1: fixed thresholds
            if let Some(bounds) = self.schema.field(name).and_then(|s| s.thresholds.as_ref()) {
                if let Some(anomaly) =
                    threshold::check(name, *value, bounds, frame.timestamp)
                {
                    self.threshold_anomalies += 1;
                    anomalies.push(anomaly);
                }
            }

            // Detector 2: rate of change against the previous frame
            if let Some(anomaly) = self.check_derivative(name, *value, frame.timestamp) {
                self.derivative_anomalies += 1;
                anomalies.push(anomaly);
            }

            // Detector 3: rolling z-score over this detector's own window
            if let Some(window) = self.field_history.get(name) {
                if let Some(anomaly) =
                    statistical::check(name, *value, window, self.z_threshold, frame.timestamp)
                {
                    self.zscore_anomalies += 1;
                    anomalies.push(anomaly);
                }
            }
        }

        for anomaly in &anomalies {
            match anomaly.severity {
                Severity::Critical => self.critical_count += 1,
                Severity::Warning => self.warning_count += 1,
            }
            log::debug!(
                "anomaly [{}] {} at t={}",
                anomaly.severity,
                anomaly.description,
                anomaly.timestamp
            );
        }

        // Histories update after all detectors ran
        for (name, value) in &frame.fields {
            let window = self.field_history.entry(name.clone()).or_default();
            if window.len() == self.history_size {
                window.pop_front();
            }
            window.push_back((frame.timestamp, *value));
        }
        self.previous = Some(frame.clone());
        self.frames_analyzed += 1;

        LabeledFrame { frame, anomalies }
    }

    fn check_derivative(&self, field: &str, value: f64, timestamp: f64) -> Option<Anomaly> {
        let max_rate = self.schema.field(field)?.max_rate?;
        let previous = self.previous.as_ref()?;
        let last_value = previous.fields.get(field)?;

        let dt = timestamp - previous.timestamp;
        if dt <= 0.0 {
            return None;
        }

        let rate = (value - last_value).abs() / dt;
        if rate <= max_rate {
            return None;
        }

        let severity = if rate > 2.0 * max_rate {
            Severity::Critical
        } else {
            Severity::Warning
        };

        Some(Anomaly {
            field: field.to_string(),
            value,
            kind: DetectionKind::Derivative,
            severity,
            description: format!(
                "{} changed at {:.3}/s, limit {:.3}/s",
                field, rate, max_rate
            ),
            timestamp,
        })
    }

    pub fn stats(&self) -> DetectorStats {
        let total = self.threshold_anomalies + self.derivative_anomalies + self.zscore_anomalies;
        DetectorStats {
            frames_analyzed: self.frames_analyzed,
            threshold_anomalies: self.threshold_anomalies,
            derivative_anomalies: self.derivative_anomalies,
            zscore_anomalies: self.zscore_anomalies,
            critical_count: self.critical_count,
            warning_count: self.warning_count,
            anomaly_rate: total as f64 / self.frames_analyzed.max(1) as f64,
        }
    }

    /// Zero the counters; field windows and the previous-frame pointer
    /// survive so detection context is not lost.
    pub fn reset_statistics(&mut self) {
        self.frames_analyzed = 0;
        self.threshold_anomalies = 0;
        self.derivative_anomalies = 0;
        self.zscore_anomalies = 0;
        self.critical_count = 0;
        self.warning_count = 0;
    }

    /// Full mission reset: statistics, windows and previous frame.
    pub fn reset(&mut self) {
        self.reset_statistics();
        self.field_history.clear();
        self.previous = None;
    }
}
