//! Cleaner Types
//!
//! Cleaned frame, quality levels and per-field repair records.
//! No logic here - only data structures.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::logic::frame::FieldValue;

// ============================================================================
// QUALITY
// ============================================================================

/// Coarse confidence label for a cleaned frame. Derived, never set
/// directly: digest validity picks the starting level, repair count can
/// only push it down, and `Interpolated` marks frames synthesized from
/// history after a packet loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Degraded,
    Medium,
    Low,
    Interpolated,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Degraded => "degraded",
            Quality::Medium => "medium",
            Quality::Low => "low",
            Quality::Interpolated => "interpolated",
        }
    }

    /// Lower is better. Used to make downgrades one-directional.
    fn rank(&self) -> u8 {
        match self {
            Quality::High => 0,
            Quality::Degraded => 1,
            Quality::Medium => 2,
            Quality::Low => 3,
            Quality::Interpolated => 4,
        }
    }

    /// The worse of two levels; quality never improves during cleaning.
    pub fn worse_of(self, other: Quality) -> Quality {
        if other.rank() > self.rank() { other } else { self }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REPAIR RECORDS
// ============================================================================

/// Which substitution fixed a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMethod {
    /// Linear extrapolation from the last two history values of the field
    Interpolation,
    /// Midpoint of the field's declared valid range
    RangeMidpoint,
    /// No schema information available; zero substituted
    DefaultZero,
    /// Clamped to the declared range bounds
    Clamp,
    /// Rate-limit violation replaced by extrapolation
    RateInterpolation,
    /// Rate-limit violation with too little history; last value repeated
    HoldLast,
}

impl RepairMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairMethod::Interpolation => "interpolation",
            RepairMethod::RangeMidpoint => "range_midpoint",
            RepairMethod::DefaultZero => "default_zero",
            RepairMethod::Clamp => "clamp",
            RepairMethod::RateInterpolation => "rate_interpolation",
            RepairMethod::HoldLast => "hold_last",
        }
    }
}

/// One field substitution applied during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub field: String,
    pub method: RepairMethod,
    pub original: FieldValue,
    pub repaired: f64,
}

// ============================================================================
// CLEAN FRAME
// ============================================================================

/// Cleaning metadata attached to every produced frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanMetadata {
    pub quality: Quality,
    pub checksum_valid: bool,
    pub repairs: Vec<RepairRecord>,
    pub warnings: Vec<String>,
}

/// Validated and repaired frame leaving the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanFrame {
    pub timestamp: f64,
    pub frame_id: u64,
    pub fields: BTreeMap<String, f64>,
    pub metadata: CleanMetadata,
}

// ============================================================================
// CLEANER STATISTICS
// ============================================================================

/// Read-only cleaner snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanerStats {
    pub packets_cleaned: u64,
    pub packets_interpolated: u64,
    pub packets_unrecoverable: u64,
    pub checksum_failures: u64,
    pub fields_repaired: u64,
    pub repair_rate: f64,
}
