//! Rolling Z-Score Detector
//!
//! Keeps a bounded (timestamp, value) window per field and flags values
//! that sit too many standard deviations from the window mean. Stays
//! silent until a field has accumulated enough observations, and skips
//! fields whose window has no variance to compare against.

use std::collections::VecDeque;

use crate::constants::Z_SCORE_MIN_SAMPLES;

use super::types::{Anomaly, DetectionKind, Severity};

/// Stddev below this is treated as no variance
const MIN_STDDEV: f64 = 1e-9;

pub type FieldWindow = VecDeque<(f64, f64)>;

/// Population mean and standard deviation over a window.
fn mean_stddev(window: &FieldWindow) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().map(|(_, v)| v).sum::<f64>() / n;
    let variance = window.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Check one value against the field's prior observations. The current
/// value must not be in the window yet.
pub fn check(
    field: &str,
    value: f64,
    window: &FieldWindow,
    z_threshold: f64,
    timestamp: f64,
) -> Option<Anomaly> {
    if window.len() < Z_SCORE_MIN_SAMPLES {
        return None;
    }

    let (mean, stddev) = mean_stddev(window);
    if stddev < MIN_STDDEV {
        return None;
    }

    let z = (value - mean).abs() / stddev;
    if z <= z_threshold {
        return None;
    }

    let severity = if z > 1.5 * z_threshold {
        Severity::Critical
    } else {
        Severity::Warning
    };

    Some(Anomaly {
        field: field.to_string(),
        value,
        kind: DetectionKind::ZScore,
        severity,
        description: format!(
            "{} = {:.3} deviates {:.2} sigma from rolling mean {:.3}",
            field, value, z, mean
        ),
        timestamp,
    })
}
