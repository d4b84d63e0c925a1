//! Anomaly Types
//!
//! Findings attached to a cleaned frame and the labeled frame that
//! leaves the detector. No logic here - only data structures.

use serde::{Deserialize, Serialize};

use crate::logic::cleaner::CleanFrame;

// ============================================================================
// SEVERITY
// ============================================================================

/// Anomaly criticality. Every finding carries exactly one of these;
/// unranked anomalies are never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Severity::Warning),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// DETECTION KIND
// ============================================================================

/// Which detector produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    Threshold,
    Derivative,
    ZScore,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Threshold => "threshold",
            DetectionKind::Derivative => "derivative",
            DetectionKind::ZScore => "zscore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "threshold" => Some(DetectionKind::Threshold),
            "derivative" => Some(DetectionKind::Derivative),
            "zscore" => Some(DetectionKind::ZScore),
            _ => None,
        }
    }
}

// ============================================================================
// ANOMALY
// ============================================================================

/// One finding on one field of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub field: String,
    pub value: f64,
    pub kind: DetectionKind,
    pub severity: Severity,
    pub description: String,
    pub timestamp: f64,
}

// ============================================================================
// LABELED FRAME
// ============================================================================

/// A cleaned frame plus its (possibly empty) anomaly list. Same shape
/// as the cleaned frame with one extra key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFrame {
    #[serde(flatten)]
    pub frame: CleanFrame,
    pub anomalies: Vec<Anomaly>,
}

impl LabeledFrame {
    pub fn has_critical(&self) -> bool {
        self.anomalies.iter().any(|a| a.severity == Severity::Critical)
    }
}

// ============================================================================
// DETECTOR STATISTICS
// ============================================================================

/// Read-only detector snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorStats {
    pub frames_analyzed: u64,
    pub threshold_anomalies: u64,
    pub derivative_anomalies: u64,
    pub zscore_anomalies: u64,
    pub critical_count: u64,
    pub warning_count: u64,
    pub anomaly_rate: f64,
}
