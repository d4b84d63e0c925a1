//! Threshold Detector
//!
//! Compares a field against its configured alarm bounds. Critical
//! bounds are checked before warning bounds and a field reports at most
//! one threshold anomaly per call.

use crate::logic::schema::ThresholdBounds;

use super::types::{Anomaly, DetectionKind, Severity};

pub fn check(field: &str, value: f64, bounds: &ThresholdBounds, timestamp: f64) -> Option<Anomaly> {
    let finding = |severity: Severity, description: String| Anomaly {
        field: field.to_string(),
        value,
        kind: DetectionKind::Threshold,
        severity,
        description,
        timestamp,
    };

    if let Some(lc) = bounds.low_critical {
        if value < lc {
            return Some(finding(
                Severity::Critical,
                format!("{} = {:.3} below critical low bound {:.3}", field, value, lc),
            ));
        }
    }
    if let Some(hc) = bounds.high_critical {
        if value > hc {
            return Some(finding(
                Severity::Critical,
                format!("{} = {:.3} above critical high bound {:.3}", field, value, hc),
            ));
        }
    }
    if let Some(lw) = bounds.low_warning {
        if value < lw {
            return Some(finding(
                Severity::Warning,
                format!("{} = {:.3} below warning low bound {:.3}", field, value, lw),
            ));
        }
    }
    if let Some(hw) = bounds.high_warning {
        if value > hw {
            return Some(finding(
                Severity::Warning,
                format!("{} = {:.3} above warning high bound {:.3}", field, value, hw),
            ));
        }
    }

    None
}
